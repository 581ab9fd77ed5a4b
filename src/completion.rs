//! Completion of element, cell and asset names inside an open helper call.

use once_cell::sync::Lazy;
use regex::Regex;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionTextEdit, Position, Range, TextEdit,
};

use crate::index::IndexKind;
use crate::workspace::Workspace;

/// Characters that reopen completion while typing a name.
pub fn trigger_characters() -> Vec<String> {
    ['\'', '"', '/', '\\', '_']
        .into_iter()
        .chain('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .map(String::from)
        .collect()
}

/// The index to complete from and the name typed so far, when the cursor
/// sits inside an unterminated `$this->element('`, `$this->cell('`,
/// `$this->Html->script('` or `$this->Html->css('` argument.
pub fn completion_target(line_prefix: &str) -> Option<(IndexKind, &str)> {
    static TARGETS: Lazy<[(IndexKind, Regex); 4]> = Lazy::new(|| {
        [
            (
                IndexKind::Elements,
                Regex::new(r#"\$this->element\s*\(\s*['"](?<prefix>[\w/.]*)$"#).expect("element completion regex"),
            ),
            (
                IndexKind::Cells,
                Regex::new(r#"\$this->cell\s*\(\s*['"](?<prefix>[\w/.]*)$"#).expect("cell completion regex"),
            ),
            (
                IndexKind::Scripts,
                Regex::new(r#"\$this->Html->script\s*\(\s*['"](?<prefix>[\w/\d_.]*)$"#)
                    .expect("script completion regex"),
            ),
            (
                IndexKind::Styles,
                Regex::new(r#"\$this->Html->css\s*\(\s*['"](?<prefix>[\w/.]*)$"#).expect("css completion regex"),
            ),
        ]
    });

    TARGETS.iter().find_map(|(kind, regex)| {
        let prefix = regex.captures(line_prefix)?.name("prefix")?.as_str();
        Some((*kind, prefix))
    })
}

/// Completion items for the line text before `position`.
pub fn completions(workspace: &Workspace, line_prefix: &str, position: Position) -> Vec<CompletionItem> {
    let Some((kind, prefix)) = completion_target(line_prefix) else {
        return Vec::new();
    };

    let snapshot = workspace.snapshot();
    let item_kind = match kind {
        IndexKind::Elements | IndexKind::Cells => CompletionItemKind::SNIPPET,
        IndexKind::Scripts | IndexKind::Styles => CompletionItemKind::FILE,
    };

    snapshot
        .indices
        .get(kind)
        .names_with_prefix(prefix)
        .into_iter()
        .map(|name| completion_item(name, prefix, position, item_kind))
        .collect()
}

/// The text of `line` before a UTF-16 `character` offset.
pub fn line_prefix(line: &str, character: u32) -> &str {
    let mut units = 0;
    for (at, c) in line.char_indices() {
        if units >= character as usize || c == '\n' || c == '\r' {
            return &line[..at];
        }
        units += c.len_utf16();
    }
    line
}

/// Length in characters of the case-insensitive common prefix.
pub fn common_prefix_len(typed: &str, name: &str) -> usize {
    typed
        .chars()
        .zip(name.chars())
        .take_while(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
        .count()
}

fn completion_item(
    name: &str,
    typed: &str,
    position: Position,
    kind: CompletionItemKind,
) -> CompletionItem {
    let common = common_prefix_len(typed, name);
    let unmatched: usize = typed.chars().skip(common).map(char::len_utf16).sum();
    let start = position.character.saturating_sub(unmatched as u32);

    CompletionItem {
        label: name.to_string(),
        kind: Some(kind),
        detail: Some(name.to_string()),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: Range::new(Position::new(position.line, start), position),
            new_text: name.chars().skip(common).collect(),
        })),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::test_utils::{create_test_project_dir, touch};

    #[test]
    fn test_completion_targets() {
        assert_eq!(
            completion_target("<?= $this->element('widg"),
            Some((IndexKind::Elements, "widg"))
        );
        assert_eq!(completion_target("$this->cell( \""), Some((IndexKind::Cells, "")));
        assert_eq!(
            completion_target("$this->Html->script('vendor/jq"),
            Some((IndexKind::Scripts, "vendor/jq"))
        );
        assert_eq!(completion_target("$this->Html->css('Blog."), Some((IndexKind::Styles, "Blog.")));
        assert_eq!(completion_target("$this->element('done') ?>"), None);
    }

    #[test]
    fn test_common_prefix_ignores_case() {
        assert_eq!(common_prefix_len("blog.Si", "Blog.sidebar"), 7);
        assert_eq!(common_prefix_len("", "Blog.sidebar"), 0);
        assert_eq!(common_prefix_len("Blox", "Blog"), 3);
    }

    #[test]
    fn test_items_insert_remaining_suffix() {
        let (_temp_dir, root) = create_test_project_dir();
        touch(&root, "templates/element/widgets/card.php");
        touch(&root, "templates/element/widgets/list.php");
        touch(&root, "templates/element/footer.php");
        let workspace = Workspace::open(&root, Settings::default());
        let line = "<?= $this->element('Widgets/c";
        let position = Position::new(4, line.len() as u32);

        let items = completions(&workspace, line, position);

        assert_eq!(items.len(), 1);
        let card = &items[0];
        assert_eq!(card.label, "widgets/card");
        assert_eq!(card.kind, Some(CompletionItemKind::SNIPPET));
        let Some(CompletionTextEdit::Edit(edit)) = &card.text_edit else {
            panic!("expected a text edit");
        };
        assert_eq!(edit.new_text, "ard");
        assert_eq!(edit.range, Range::new(Position::new(4, position.character), position));
    }

    #[test]
    fn test_line_prefix_counts_utf16_units() {
        let line = "<?= '🎂' . $this->element('wid') ?>\n";

        assert_eq!(line_prefix(line, 7), "<?= '🎂");
        assert_eq!(line_prefix(line, 30), "<?= '🎂' . $this->element('wid");
        assert_eq!(line_prefix(line, 200), "<?= '🎂' . $this->element('wid') ?>");
    }

    #[test]
    fn test_range_with_astral_name() {
        let (_temp_dir, root) = create_test_project_dir();
        touch(&root, "templates/element/𝒜bc.php");
        let workspace = Workspace::open(&root, Settings::default());
        let line = "$this->element('𝒜b";
        let position = Position::new(0, 19);

        let items = completions(&workspace, line, position);

        assert_eq!(items.len(), 1);
        let Some(CompletionTextEdit::Edit(edit)) = &items[0].text_edit else {
            panic!("expected a text edit");
        };
        assert_eq!(edit.new_text, "c");
        assert_eq!(edit.range, Range::new(position, position));
    }

    #[test]
    fn test_trigger_characters() {
        let triggers = trigger_characters();

        assert!(triggers.contains(&"'".to_string()));
        assert!(triggers.contains(&"\\".to_string()));
        assert!(triggers.contains(&"q".to_string()));
        assert_eq!(triggers.len(), 5 + 26 + 26 + 10);
    }
}
