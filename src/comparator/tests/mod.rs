mod tests_reverse;
