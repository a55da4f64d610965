use scraper::ElementRef;

/// A single way of reading a federation code out of a table cell.
pub type AssociationStrategy = fn(ElementRef<'_>) -> Option<String>;

/// Strategies in order of preference. Newer pages carry the code as a flag
/// class (`<p class="fg fg-CHN">`), older ones as bare cell text.
pub const STRATEGIES: &[AssociationStrategy] = &[flag_class_code, bare_text_code];

pub fn extract_association(cell: ElementRef<'_>) -> Option<String> {
    STRATEGIES.iter().find_map(|strategy| strategy(cell))
}

pub fn flag_class_code(cell: ElementRef<'_>) -> Option<String> {
    cell.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .flat_map(|el| el.value().classes())
        .find_map(|class| class.strip_prefix("fg-"))
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(ToString::to_string)
}

pub fn bare_text_code(cell: ElementRef<'_>) -> Option<String> {
    let text = cell.text().collect::<String>();
    let text = text.trim();
    let len = text.chars().count();
    if (len == 2 || len == 3) && text.chars().all(char::is_alphabetic) {
        Some(text.to_string())
    } else {
        None
    }
}
