mod tests_escape;
