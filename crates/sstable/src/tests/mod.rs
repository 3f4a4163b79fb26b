mod entry_tests;
mod klog_tests;
