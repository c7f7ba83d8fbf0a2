mod helpers;

mod consolidation_tests;
