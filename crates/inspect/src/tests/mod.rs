mod helpers;

mod listing_tests;
