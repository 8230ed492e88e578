//! Prompt assembly for line-art generation.
//!
//! Prompts are comma-separated tag lists. Every helper here splits on `,`,
//! trims each tag, drops empty tags and joins the survivors with `", "`.

use std::collections::HashSet;

const QUALITY_TAGS: &str = "masterpiece, best quality";
const STYLE_TAGS: &str = "monochrome, lineart, white background";
const THIN_LINE_LORA: &str = "sdxl_BWLine";
const BOLD_LINE_LORA: &str = "sdxl_BW_bold_Line";

/// Tags that fight the monochrome line-art look.
pub const EXCLUDED_TAGS: [&str; 2] = ["sketch", "transparent background"];

/// Single color words; a tag containing one of these as a word is dropped.
const COLOR_WORDS: [&str; 9] = [
    "pink", "red", "orange", "brown", "yellow", "green", "blue", "purple", "blonde",
];

/// Multi-word color phrases matched anywhere in a tag.
const COLOR_PHRASES: [&str; 2] = ["colored skin", "white hair"];

pub const DEFAULT_NEGATIVE_PROMPT: &str = "lowres, error, extra digit, fewer digits, cropped, worst quality, \
     low quality, normal quality, jpeg artifacts, blurry";

pub fn split_tags(prompt: &str) -> impl Iterator<Item = &str> {
    prompt.split(',').map(str::trim).filter(|tag| !tag.is_empty())
}

fn join_tags<'a>(tags: impl Iterator<Item = &'a str>) -> String {
    tags.collect::<Vec<_>>().join(", ")
}

/// Drop every tag equal (ignoring case) to one of `excluded`.
pub fn remove_tags(prompt: &str, excluded: &[&str]) -> String {
    join_tags(split_tags(prompt).filter(|tag| {
        !excluded.iter().any(|ex| ex.eq_ignore_ascii_case(tag))
    }))
}

/// Keep the first occurrence of each tag, comparing case-insensitively.
pub fn remove_duplicates(prompt: &str) -> String {
    let mut seen = HashSet::new();
    join_tags(split_tags(prompt).filter(|tag| seen.insert(tag.to_lowercase())))
}

/// Whether `tag` names a color. LoRA markers (`<...>`) never count.
pub fn is_color_tag(tag: &str) -> bool {
    let tag = tag.trim();
    if tag.starts_with('<') {
        return false;
    }

    let lower = tag.to_lowercase();
    if COLOR_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }

    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| COLOR_WORDS.contains(&word))
}

pub fn remove_color(prompt: &str) -> String {
    join_tags(split_tags(prompt).filter(|tag| !is_color_tag(tag)))
}

/// Build the positive prompt sent to the backend.
///
/// `bold` shifts weight from the thin-line LoRA to the bold-line one; both
/// weights always sum to 1.
pub fn build_lineart_prompt(user_text: &str, bold: f32) -> String {
    let bold = bold.clamp(0.0, 1.0);
    let thin = 1.0 - bold;

    let raw = format!(
        "{QUALITY_TAGS}, <lora:{THIN_LINE_LORA}:{thin:.2}>, <lora:{BOLD_LINE_LORA}:{bold:.2}>, {STYLE_TAGS}, {}",
        user_text.trim()
    );

    let prompt = remove_tags(&raw, &EXCLUDED_TAGS);
    let prompt = remove_duplicates(&prompt);
    remove_color(&prompt).trim().to_string()
}

pub fn build_negative_prompt(user_text: &str) -> String {
    user_text.trim().to_string()
}

/// Drop-down label for a LoRA listed by the backend.
pub fn lora_option_label(name: &str, alias: &str) -> String {
    format!("{name} ({alias})")
}

/// Extract the alias from a `"name (alias)"` label. Labels without
/// parentheses are used as-is.
pub fn lora_alias(selection: &str) -> &str {
    if selection.contains('(') && selection.contains(')') {
        let tail = selection.rsplit('(').next().unwrap_or(selection);
        tail.split(')').next().unwrap_or(tail).trim()
    } else {
        selection.trim()
    }
}

/// Append a full-strength LoRA marker for `selection` to `prompt`.
pub fn append_lora_tag(prompt: &str, selection: &str) -> String {
    let alias = lora_alias(selection);
    if alias.is_empty() {
        return prompt.trim().to_string();
    }

    let tag = format!("<lora:{alias}:1.0>");
    let updated = if prompt.trim().is_empty() {
        tag
    } else {
        format!("{prompt}, {tag}")
    };

    updated.replace(", <lora:[]:1.0>", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt() {
        assert_eq!(
            build_lineart_prompt("", 0.0),
            "masterpiece, best quality, <lora:sdxl_BWLine:1.00>, <lora:sdxl_BW_bold_Line:0.00>, \
             monochrome, lineart, white background"
        );
    }

    #[test]
    fn test_bold_weights_sum_to_one() {
        let prompt = build_lineart_prompt("1girl", 0.3);
        assert!(prompt.contains("<lora:sdxl_BWLine:0.70>"));
        assert!(prompt.contains("<lora:sdxl_BW_bold_Line:0.30>"));
        assert!(prompt.ends_with("1girl"));
    }

    #[test]
    fn test_bold_is_clamped() {
        let prompt = build_lineart_prompt("", 4.0);
        assert!(prompt.contains("<lora:sdxl_BWLine:0.00>"));
        assert!(prompt.contains("<lora:sdxl_BW_bold_Line:1.00>"));
    }

    #[test]
    fn test_user_tags_are_filtered() {
        let prompt = build_lineart_prompt(
            "  1girl, sketch, Monochrome, red hair, smile, transparent background, blonde, 1girl ",
            0.0,
        );
        assert_eq!(
            prompt,
            "masterpiece, best quality, <lora:sdxl_BWLine:1.00>, <lora:sdxl_BW_bold_Line:0.00>, \
             monochrome, lineart, white background, 1girl, smile"
        );
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        assert_eq!(remove_duplicates("a, B, b, c,, a"), "a, B, c");
    }

    #[test]
    fn test_remove_duplicates_idempotent() {
        let once = remove_duplicates("smile, Smile,solo , 1girl, solo");
        assert_eq!(remove_duplicates(&once), once);
    }

    #[test]
    fn test_remove_tags_ignores_case() {
        assert_eq!(remove_tags("Sketch, solo, sketch", &EXCLUDED_TAGS), "solo");
    }

    #[test]
    fn test_color_tags() {
        assert!(is_color_tag("red hair"));
        assert!(is_color_tag("light_blue eyes"));
        assert!(is_color_tag("white hair"));
        assert!(is_color_tag("colored skin"));
        assert!(!is_color_tag("white background"));
        assert!(!is_color_tag("tired"));
        assert!(!is_color_tag("<lora:red_style:1.0>"));
    }

    #[test]
    fn test_remove_color_idempotent() {
        let once = remove_color("1girl, green eyes, shirt, yellow, bored");
        assert_eq!(once, "1girl, shirt, bored");
        assert_eq!(remove_color(&once), once);
    }

    #[test]
    fn test_lora_alias() {
        assert_eq!(lora_alias("my_model (inkpen)"), "inkpen");
        assert_eq!(lora_alias("a (b) (c)"), "c");
        assert_eq!(lora_alias("plain"), "plain");
    }

    #[test]
    fn test_append_lora_tag() {
        assert_eq!(append_lora_tag("", "x (ink)"), "<lora:ink:1.0>");
        assert_eq!(append_lora_tag("1girl", "x (ink)"), "1girl, <lora:ink:1.0>");
        assert_eq!(append_lora_tag("1girl", "[]"), "1girl");
        assert_eq!(append_lora_tag(" 1girl ", ""), "1girl");
    }

    #[test]
    fn test_option_label_roundtrip() {
        let label = lora_option_label("sdxl_BWLine", "bwline");
        assert_eq!(lora_alias(&label), "bwline");
    }
}
