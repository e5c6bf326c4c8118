mod tests_comparator;
