//! Text helpers for Telegram MarkdownV2 output.
//!
//! Built on the `lazy-regex` crate: patterns are validated at compile time
//! and initialized on first use.

use lazy_regex::lazy_regex;

/// Match any character Telegram's MarkdownV2 parser treats as reserved.
static RE_MDV2_RESERVED: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"[_*\[\]()~`>#+\-=|{}.!]");

/// Escapes text for embedding in a MarkdownV2 message.
///
/// Every reserved character gains a leading backslash; nothing else is
/// touched. Text without reserved characters passes through unchanged.
#[must_use]
pub fn escape_markdown_v2(text: &str) -> String {
    RE_MDV2_RESERVED.replace_all(text, r"\$0").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(escape_markdown_v2("Hello world"), "Hello world");
        assert_eq!(escape_markdown_v2("Привет 123"), "Привет 123");
        assert_eq!(escape_markdown_v2(""), "");
    }

    #[test]
    fn test_reserved_characters_escaped() {
        assert_eq!(escape_markdown_v2("a_b"), r"a\_b");
        assert_eq!(escape_markdown_v2("*bold*"), r"\*bold\*");
        assert_eq!(escape_markdown_v2("v1.2-rc!"), r"v1\.2\-rc\!");
        assert_eq!(escape_markdown_v2("[link](url)"), r"\[link\]\(url\)");
        assert_eq!(
            escape_markdown_v2("{a|b} #tag > ~x~ = + `c`"),
            r"\{a\|b\} \#tag \> \~x\~ \= \+ \`c\`"
        );
    }

    #[test]
    fn test_backslash_count_matches_reserved_count() {
        let input = "Update 1.2 (final) - read this!";
        let reserved: &[char] = &[
            '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
            '!',
        ];
        let expected = input.chars().filter(|c| reserved.contains(c)).count();
        let escaped = escape_markdown_v2(input);
        assert_eq!(escaped.chars().filter(|c| *c == '\\').count(), expected);
    }

    #[test]
    fn test_every_reserved_char_preceded_by_backslash() {
        let escaped = escape_markdown_v2("a.b!c-d(e)f");
        let chars: Vec<char> = escaped.chars().collect();
        for (i, c) in chars.iter().enumerate() {
            if ['.', '!', '-', '(', ')'].contains(c) {
                assert!(i > 0);
                assert_eq!(chars[i - 1], '\\');
            }
        }
    }
}
