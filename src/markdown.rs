//! Conversion between Markdown text and Notion blocks.
//!
//! The mapping is line oriented and deliberately small: headings, list items,
//! to-dos, quotes, dividers, fenced code and paragraphs. Inline `**bold**`,
//! `*italic*`, `~~strike~~`, `` `code` `` and `[text](url)` become rich-text
//! annotations. Anything Notion returns that is not modelled renders as a
//! visible `[unsupported block: <type>]` placeholder.

use crate::notion::types::{plain_text, text_segments, Annotations, Block, RichText, MAX_TEXT_LEN};
use crate::tasks::models::LogType;
use chrono::{DateTime, FixedOffset, Local};
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)](?:\s+(.*))?$").unwrap());

static TODO_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*+]\s+\[([ xX])\](?:\s+(.*))?$").unwrap());

/// Notion's name for untagged code.
pub const PLAIN_TEXT_LANGUAGE: &str = "plain text";

/// Code languages Notion accepts.
const NOTION_LANGUAGES: &[&str] = &[
    "abap", "arduino", "bash", "basic", "c", "clojure", "coffeescript", "c++", "c#", "css",
    "dart", "diff", "docker", "elixir", "elm", "erlang", "flow", "fortran", "f#", "gherkin",
    "glsl", "go", "graphql", "groovy", "haskell", "html", "java", "javascript", "json", "julia",
    "kotlin", "latex", "less", "lisp", "livescript", "lua", "makefile", "markdown", "markup",
    "matlab", "mermaid", "nix", "objective-c", "ocaml", "pascal", "perl", "php", "plain text",
    "powershell", "prolog", "protobuf", "python", "r", "reason", "ruby", "rust", "sass", "scala",
    "scheme", "scss", "shell", "sql", "swift", "typescript", "vb.net", "verilog", "vhdl",
    "visual basic", "webassembly", "xml", "yaml",
];

/// Map a fence tag to a Notion code language.
///
/// Common short names are expanded; unknown or empty tags become
/// [`PLAIN_TEXT_LANGUAGE`].
#[must_use]
pub fn code_language(tag: &str) -> String {
    let tag = tag.trim().to_ascii_lowercase();
    let name = match tag.as_str() {
        "rs" => "rust",
        "js" | "jsx" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        "sh" | "zsh" | "console" => "shell",
        "yml" => "yaml",
        "md" => "markdown",
        "cpp" | "cxx" | "hpp" => "c++",
        "cs" | "csharp" => "c#",
        "kt" => "kotlin",
        "golang" => "go",
        "dockerfile" => "docker",
        "ps1" | "pwsh" => "powershell",
        "proto" => "protobuf",
        "" | "text" | "txt" | "plain" | "plaintext" => PLAIN_TEXT_LANGUAGE,
        other => other,
    };
    if NOTION_LANGUAGES.contains(&name) {
        name.to_string()
    } else {
        PLAIN_TEXT_LANGUAGE.to_string()
    }
}

/// Convert Markdown to Notion blocks.
///
/// Blank lines separate blocks and never produce empty blocks; consecutive
/// text lines join into one paragraph. An unclosed code fence runs to the end
/// of the input.
#[must_use]
pub fn markdown_to_blocks(markdown: &str) -> Vec<Block> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut quote: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;

        if line.is_empty() {
            flush(&mut blocks, &mut paragraph, &mut quote);
            continue;
        }

        if let Some(tag) = line.strip_prefix("```") {
            flush(&mut blocks, &mut paragraph, &mut quote);
            let start = i;
            while i < lines.len() && !lines[i].trim_start().starts_with("```") {
                i += 1;
            }
            let code = lines[start..i].join("\n");
            // Skip the closing fence, if there is one.
            if i < lines.len() {
                i += 1;
            }
            blocks.push(Block::Code { language: code_language(tag), text: text_segments(&code) });
            continue;
        }

        if let Some(rest) = line.strip_prefix('>') {
            if !paragraph.is_empty() {
                flush(&mut blocks, &mut paragraph, &mut quote);
            }
            quote.push(rest.trim_start());
            continue;
        }

        let block = if let Some((level, text)) = heading(line) {
            Some(Block::Heading { level, text: parse_inline(text) })
        } else if matches!(line, "---" | "***" | "___") {
            Some(Block::Divider)
        } else if let Some(caps) = TODO_ITEM.captures(line) {
            Some(Block::ToDo {
                checked: !caps[1].trim().is_empty(),
                text: parse_inline(capture(&caps, 2)),
            })
        } else if matches!(line, "-" | "*" | "+") {
            Some(Block::BulletedListItem(Vec::new()))
        } else if let Some(rest) =
            line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")).or_else(|| line.strip_prefix("+ "))
        {
            Some(Block::BulletedListItem(parse_inline(rest.trim())))
        } else {
            NUMBERED_ITEM
                .captures(line)
                .map(|caps| Block::NumberedListItem(parse_inline(capture(&caps, 1))))
        };

        match block {
            Some(block) => {
                flush(&mut blocks, &mut paragraph, &mut quote);
                blocks.push(block);
            }
            None => {
                if !quote.is_empty() {
                    flush(&mut blocks, &mut paragraph, &mut quote);
                }
                paragraph.push(line);
            }
        }
    }
    flush(&mut blocks, &mut paragraph, &mut quote);
    blocks
}

/// Emit the pending paragraph or quote, if any.
fn flush(blocks: &mut Vec<Block>, paragraph: &mut Vec<&str>, quote: &mut Vec<&str>) {
    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph(parse_inline(&paragraph.join("\n"))));
        paragraph.clear();
    }
    if !quote.is_empty() {
        blocks.push(Block::Quote(parse_inline(&quote.join("\n"))));
        quote.clear();
    }
}

/// An optional capture group, trimmed; empty when the group did not match.
fn capture<'a>(caps: &regex::Captures<'a>, group: usize) -> &'a str {
    caps.get(group).map_or("", |m| m.as_str().trim())
}

/// Parse an ATX heading line into its level (clamped to 3) and text.
fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    // `hashes` is at most 6, so the cast is lossless.
    #[allow(clippy::cast_possible_truncation)]
    let level = hashes.min(3) as u8;
    Some((level, rest.trim()))
}

/// Convert Notion blocks to Markdown, one blank line between blocks.
#[must_use]
pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut rendered = Vec::with_capacity(blocks.len());
    let mut number = 0;
    for block in blocks {
        number = if matches!(block, Block::NumberedListItem(_)) { number + 1 } else { 0 };
        rendered.push(render_block(block, number));
    }
    rendered.join("\n\n")
}

fn render_block(block: &Block, number: usize) -> String {
    match block {
        Block::Paragraph(text) => render_inline(text),
        Block::Heading { level, text } => {
            format!("{} {}", "#".repeat(usize::from((*level).clamp(1, 3))), render_inline(text))
        }
        Block::BulletedListItem(text) => format!("- {}", render_inline(text)),
        Block::NumberedListItem(text) => format!("{number}. {}", render_inline(text)),
        Block::ToDo { checked, text } => {
            format!("- [{}] {}", if *checked { "x" } else { " " }, render_inline(text))
        }
        Block::Quote(text) => render_inline(text)
            .lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Code { language, text } => {
            let tag = if language == PLAIN_TEXT_LANGUAGE { "" } else { language.as_str() };
            let code = plain_text(text);
            if code.is_empty() {
                format!("```{tag}\n```")
            } else {
                format!("```{tag}\n{code}\n```")
            }
        }
        Block::Divider => "---".to_string(),
        Block::Unsupported(kind) => format!("[unsupported block: {kind}]"),
    }
}

/// Parse inline Markdown into rich-text segments.
#[must_use]
pub fn parse_inline(text: &str) -> Vec<RichText> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    parse_inline_into(&chars, Annotations::default(), None, &mut out);
    out
}

fn parse_inline_into(
    chars: &[char],
    base: Annotations,
    link: Option<&str>,
    out: &mut Vec<RichText>,
) {
    let mut annotations = base;
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '`' {
            if let Some(close) = find(chars, i + 1, &['`']) {
                push_text(out, &mut current, annotations, link);
                let mut code = String::from_iter(&chars[i + 1..close]);
                let code_annotations = Annotations { code: true, ..annotations };
                push_text(out, &mut code, code_annotations, link);
                i = close + 1;
                continue;
            }
        } else if starts_with(chars, i, &['*', '*']) || starts_with(chars, i, &['~', '~']) {
            let active = if c == '*' { annotations.bold } else { annotations.strikethrough };
            if active || find(chars, i + 2, &[c, c]).is_some() {
                push_text(out, &mut current, annotations, link);
                if c == '*' {
                    annotations.bold = !active;
                } else {
                    annotations.strikethrough = !active;
                }
                i += 2;
                continue;
            }
        } else if c == '*' {
            if annotations.italic || find(chars, i + 1, &['*']).is_some() {
                push_text(out, &mut current, annotations, link);
                annotations.italic = !annotations.italic;
                i += 1;
                continue;
            }
        } else if c == '[' && link.is_none() {
            if let Some((label_end, url_end)) = link_bounds(chars, i) {
                push_text(out, &mut current, annotations, link);
                let url = String::from_iter(&chars[label_end + 2..url_end]);
                parse_inline_into(&chars[i + 1..label_end], annotations, Some(url.trim()), out);
                i = url_end + 1;
                continue;
            }
        }

        current.push(c);
        i += 1;
    }
    push_text(out, &mut current, annotations, link);
}

/// Locate `](` and the closing `)` of a link starting at `open`.
fn link_bounds(chars: &[char], open: usize) -> Option<(usize, usize)> {
    let label_end = find(chars, open + 1, &[']', '('])?;
    let url_end = find(chars, label_end + 2, &[')'])?;
    (label_end > open + 1 && url_end > label_end + 2).then_some((label_end, url_end))
}

fn starts_with(chars: &[char], at: usize, marker: &[char]) -> bool {
    chars.get(at..at + marker.len()) == Some(marker)
}

fn find(chars: &[char], from: usize, marker: &[char]) -> Option<usize> {
    (from..chars.len()).find(|&at| starts_with(chars, at, marker))
}

/// Move buffered text into `out` as one or more segments.
fn push_text(out: &mut Vec<RichText>, buffer: &mut String, annotations: Annotations, link: Option<&str>) {
    if buffer.is_empty() {
        return;
    }
    let chars: Vec<char> = buffer.chars().collect();
    for chunk in chars.chunks(MAX_TEXT_LEN) {
        out.push(RichText {
            content: chunk.iter().collect(),
            annotations,
            link: link.map(str::to_string),
        });
    }
    buffer.clear();
}

/// Render rich-text segments as inline Markdown.
#[must_use]
pub fn render_inline(segments: &[RichText]) -> String {
    segments.iter().map(render_segment).collect()
}

fn render_segment(segment: &RichText) -> String {
    let a = segment.annotations;
    let mut text = segment.content.clone();
    if a.code {
        text = format!("`{text}`");
    }
    if a.italic {
        text = format!("*{text}*");
    }
    if a.bold {
        text = format!("**{text}**");
    }
    if a.strikethrough {
        text = format!("~~{text}~~");
    }
    match &segment.link {
        Some(url) => format!("[{text}]({url})"),
        None => text,
    }
}

/// Build the blocks for a work-log entry stamped with the current local time.
///
/// See [`create_log_blocks_at`].
#[must_use]
pub fn create_log_blocks(content: &str, author: &str, log_type: LogType) -> Vec<Block> {
    create_log_blocks_at(content, author, log_type, Local::now().fixed_offset())
}

/// Build the blocks for a work-log entry.
///
/// The first block is a level-3 heading naming the log type, the author and
/// the timestamp; the converted `content` follows.
#[must_use]
pub fn create_log_blocks_at(
    content: &str,
    author: &str,
    log_type: LogType,
    at: DateTime<FixedOffset>,
) -> Vec<Block> {
    let mut blocks = vec![Block::heading(3, &log_heading(author, log_type, at))];
    blocks.extend(markdown_to_blocks(content));
    blocks
}

/// Heading text for a work-log entry.
#[must_use]
pub fn log_heading(author: &str, log_type: LogType, at: DateTime<FixedOffset>) -> String {
    format!(
        "{} {} - {} ({})",
        log_type.icon(),
        log_type.label(),
        author.trim(),
        at.format("%Y-%m-%d %H:%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn text_of(block: &Block) -> String {
        plain_text(block.rich_text().unwrap_or_default())
    }

    #[test]
    fn test_empty_input_gives_no_blocks() {
        assert!(markdown_to_blocks("").is_empty());
        assert!(markdown_to_blocks("\n\n   \n").is_empty());
    }

    #[test]
    fn test_single_heading() {
        let blocks = markdown_to_blocks("# H\n");
        assert_eq!(blocks, vec![Block::heading(1, "H")]);
    }

    #[test]
    fn test_deep_headings_clamp_and_hash_needs_space() {
        let blocks = markdown_to_blocks("##### Deep\n\n#hashtag");
        assert_eq!(blocks[0], Block::heading(3, "Deep"));
        assert_eq!(blocks[1], Block::paragraph("#hashtag"));
    }

    #[test]
    fn test_empty_items_keep_their_type() {
        let blocks = vec![
            Block::heading(2, ""),
            Block::BulletedListItem(Vec::new()),
            Block::NumberedListItem(Vec::new()),
            Block::ToDo { checked: true, text: Vec::new() },
            Block::ToDo { checked: false, text: Vec::new() },
        ];
        let markdown = blocks_to_markdown(&blocks);
        let parsed = markdown_to_blocks(&markdown);
        assert_eq!(parsed.len(), 5, "{markdown:?}");
        assert!(matches!(parsed[0], Block::Heading { level: 2, .. }));
        assert!(matches!(parsed[1], Block::BulletedListItem(_)));
        assert!(matches!(parsed[2], Block::NumberedListItem(_)));
        assert!(matches!(parsed[3], Block::ToDo { checked: true, .. }));
        assert!(matches!(parsed[4], Block::ToDo { checked: false, .. }));
        assert_eq!(blocks_to_markdown(&parsed), markdown);
    }

    #[test]
    fn test_mixed_document() {
        let markdown = "## Plan\n\
                        - first\n\
                        * second\n\
                        1. one\n\
                        2. two\n\
                        - [ ] open\n\
                        - [x] closed\n\
                        > quoted\n\
                        ---\n\
                        Some text\n\
                        continues here";
        let blocks = markdown_to_blocks(markdown);
        let kinds: Vec<&str> = blocks.iter().map(Block::type_name).collect();
        assert_eq!(
            kinds,
            vec![
                "heading_2",
                "bulleted_list_item",
                "bulleted_list_item",
                "numbered_list_item",
                "numbered_list_item",
                "to_do",
                "to_do",
                "quote",
                "divider",
                "paragraph",
            ]
        );
        assert_eq!(blocks[5], Block::ToDo { checked: false, text: vec![RichText::plain("open")] });
        assert_eq!(blocks[6], Block::ToDo { checked: true, text: vec![RichText::plain("closed")] });
        assert_eq!(text_of(&blocks[9]), "Some text\ncontinues here");
    }

    #[test]
    fn test_code_fence_keeps_language_and_body() {
        let blocks = markdown_to_blocks("```rs\nfn main() {\n\n    run();\n}\n```\nafter");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::Code { language, text } => {
                assert_eq!(language, "rust");
                assert_eq!(plain_text(text), "fn main() {\n\n    run();\n}");
            }
            other => panic!("expected code, got {other:?}"),
        }
        assert_eq!(blocks[1], Block::paragraph("after"));
    }

    #[test]
    fn test_unclosed_fence_consumes_rest() {
        let blocks = markdown_to_blocks("```\n# not a heading\n- nor a list");
        assert_eq!(
            blocks,
            vec![Block::Code {
                language: PLAIN_TEXT_LANGUAGE.to_string(),
                text: vec![RichText::plain("# not a heading\n- nor a list")],
            }]
        );
    }

    #[test]
    fn test_code_language_aliases() {
        assert_eq!(code_language("py"), "python");
        assert_eq!(code_language("YAML"), "yaml");
        assert_eq!(code_language(""), PLAIN_TEXT_LANGUAGE);
        assert_eq!(code_language("brainfuck"), PLAIN_TEXT_LANGUAGE);
    }

    #[test]
    fn test_inline_annotations() {
        let segments = parse_inline("a **bold** and *it* with `x` ~~gone~~");
        let bold = segments.iter().find(|s| s.content == "bold").unwrap();
        assert!(bold.annotations.bold);
        let italic = segments.iter().find(|s| s.content == "it").unwrap();
        assert!(italic.annotations.italic && !italic.annotations.bold);
        let code = segments.iter().find(|s| s.content == "x").unwrap();
        assert!(code.annotations.code);
        let strike = segments.iter().find(|s| s.content == "gone").unwrap();
        assert!(strike.annotations.strikethrough);
        assert_eq!(plain_text(&segments), "a bold and it with x gone");
    }

    #[test]
    fn test_inline_link() {
        let segments = parse_inline("see [the docs](https://example.com) now");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].content, "the docs");
        assert_eq!(segments[1].link.as_deref(), Some("https://example.com"));
        assert_eq!(render_inline(&segments), "see [the docs](https://example.com) now");
    }

    #[test]
    fn test_unmatched_markers_stay_literal() {
        assert_eq!(parse_inline("2 * 3 = 6"), vec![RichText::plain("2 * 3 = 6")]);
        assert_eq!(parse_inline("a ** b"), vec![RichText::plain("a ** b")]);
        assert_eq!(parse_inline("[not a link]"), vec![RichText::plain("[not a link]")]);
    }

    #[test]
    fn test_bold_italic_round_trip() {
        let segment = RichText {
            content: "both".to_string(),
            annotations: Annotations { bold: true, italic: true, ..Annotations::default() },
            link: None,
        };
        let rendered = render_inline(std::slice::from_ref(&segment));
        assert_eq!(rendered, "***both***");
        assert_eq!(parse_inline(&rendered), vec![segment]);
    }

    #[test]
    fn test_long_paragraph_is_split() {
        let long = "x".repeat(MAX_TEXT_LEN * 2 + 1);
        let blocks = markdown_to_blocks(&long);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].rich_text().unwrap().len(), 3);
        assert_eq!(text_of(&blocks[0]), long);
    }

    #[test]
    fn test_render_document() {
        let blocks = vec![
            Block::heading(2, "Notes"),
            Block::NumberedListItem(vec![RichText::plain("a")]),
            Block::NumberedListItem(vec![RichText::plain("b")]),
            Block::Divider,
            Block::Code { language: "rust".to_string(), text: vec![RichText::plain("let x = 1;")] },
            Block::Unsupported("image".to_string()),
        ];
        assert_eq!(
            blocks_to_markdown(&blocks),
            "## Notes\n\n1. a\n\n2. b\n\n---\n\n```rust\nlet x = 1;\n```\n\n[unsupported block: image]"
        );
    }

    #[test]
    fn test_multiline_quote_round_trips() {
        let blocks = vec![Block::Quote(vec![RichText::plain("one\ntwo")])];
        let markdown = blocks_to_markdown(&blocks);
        assert_eq!(markdown, "> one\n> two");
        assert_eq!(markdown_to_blocks(&markdown), blocks);
    }

    #[test]
    fn test_log_blocks() {
        let at = FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
            .unwrap();
        let blocks = create_log_blocks_at("Fixed the bug", "kim", LogType::Progress, at);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].type_name(), "heading_3");
        let heading = text_of(&blocks[0]);
        assert!(heading.contains("kim"));
        assert!(heading.contains(LogType::Progress.label()));
        assert!(heading.contains("2026-03-14 09:30"));
        assert_eq!(blocks[1], Block::paragraph("Fixed the bug"));
    }

    #[test]
    fn test_log_blocks_with_empty_content() {
        let blocks = create_log_blocks("", "lee", LogType::Note);
        assert_eq!(blocks.len(), 1);
        assert!(text_of(&blocks[0]).contains("lee"));
    }

    fn word() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9 ]{0,30}[a-z0-9]"
    }

    fn block() -> impl Strategy<Value = Block> {
        prop_oneof![
            word().prop_map(|s| Block::paragraph(&s)),
            (1u8..=3, word()).prop_map(|(level, s)| Block::heading(level, &s)),
            word().prop_map(|s| Block::BulletedListItem(text_segments(&s))),
            word().prop_map(|s| Block::NumberedListItem(text_segments(&s))),
            (any::<bool>(), word()).prop_map(|(checked, s)| Block::ToDo {
                checked,
                text: text_segments(&s)
            }),
            word().prop_map(|s| Block::Quote(text_segments(&s))),
            prop::collection::vec("[a-z ]{0,12}", 1..4).prop_map(|lines| Block::Code {
                language: "rust".to_string(),
                text: text_segments(&lines.join("\n")),
            }),
            Just(Block::Divider),
        ]
    }

    proptest! {
        #[test]
        fn prop_markdown_round_trip_preserves_blocks(blocks in prop::collection::vec(block(), 0..12)) {
            let markdown = blocks_to_markdown(&blocks);
            prop_assert_eq!(markdown_to_blocks(&markdown), blocks);
        }

        #[test]
        fn prop_every_block_consumes_a_line(input in "[a-z#>*`\\- \n]{0,80}") {
            let non_blank = input.lines().filter(|line| !line.trim().is_empty()).count();
            prop_assert!(markdown_to_blocks(&input).len() <= non_blank);
        }
    }
}
