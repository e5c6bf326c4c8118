mod helpers;
mod tests_merging;
