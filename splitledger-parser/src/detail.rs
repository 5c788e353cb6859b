use nom::error::{Error, ErrorKind};

const SNIPPET_CHARS: usize = 24;

pub fn syntax_error_detail(err: nom::Err<Error<&str>>) -> String {
    match err {
        nom::Err::Incomplete(_) => "unexpected end of line".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => match e.code {
            ErrorKind::MapRes => {
                "participant styles (name, name=amount, name=pct%) cannot be mixed".to_string()
            }
            _ if e.input.trim().is_empty() => "unexpected end of line".to_string(),
            _ => format!("unexpected input near '{}'", snippet(e.input)),
        },
    }
}

pub fn unparsed_detail(rest: &str) -> String {
    format!("unparsed input: {}", snippet(rest))
}

fn snippet(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() <= SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(SNIPPET_CHARS).collect();
    format!("{head}…")
}
