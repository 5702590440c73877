mod health_tests;
mod introspection_tests;
