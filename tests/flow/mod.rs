mod dispatch_flow_tests;
