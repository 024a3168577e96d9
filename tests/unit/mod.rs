mod app_runner_tests;
mod ordering_tests;
mod reader_tests;
mod recovery_tests;
