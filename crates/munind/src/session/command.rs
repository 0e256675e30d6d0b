//! Request parsing.

/// A parsed request line. Tokens after the argument are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command<'a> {
    Cap,
    Version,
    Nodes,
    List,
    Config(Option<&'a str>),
    Fetch(Option<&'a str>),
    Quit,
    Unknown,
}

impl<'a> Command<'a> {
    pub(crate) fn parse(line: &'a str) -> Self {
        let mut tokens = line.split_whitespace();
        let Some(word) = tokens.next() else {
            return Self::Unknown;
        };
        let argument = tokens.next();
        match word {
            "cap" => Self::Cap,
            "version" => Self::Version,
            "nodes" => Self::Nodes,
            "list" => Self::List,
            "config" => Self::Config(argument),
            "fetch" => Self::Fetch(argument),
            "quit" => Self::Quit,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::cap("cap multigraph dirtyconfig", Command::Cap)]
    #[case::list_with_node("list node1", Command::List)]
    #[case::fetch("fetch cpu", Command::Fetch(Some("cpu")))]
    #[case::config_extra_tokens("config  df   extra", Command::Config(Some("df")))]
    #[case::fetch_without_argument("fetch", Command::Fetch(None))]
    #[case::quit("quit", Command::Quit)]
    #[case::lone_dot(".", Command::Unknown)]
    #[case::empty("", Command::Unknown)]
    #[case::whitespace(" \t ", Command::Unknown)]
    #[case::case_sensitive("LIST", Command::Unknown)]
    fn parses_requests(#[case] line: &str, #[case] expected: Command<'_>) {
        assert_eq!(Command::parse(line), expected);
    }
}
