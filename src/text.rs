pub fn to_unix_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

pub fn concat_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

pub fn equal_ignoring_line_endings(expected: &str, actual: &str) -> bool {
    to_unix_line_endings(expected) == to_unix_line_endings(actual)
}
