mod tests_skiplist;
