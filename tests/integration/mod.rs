mod catalog_test;
mod executor_test;
mod shaper_test;
