use crate::{
    error::{AppError, AppResult},
    messages,
};

pub const MAX_TAGS_PER_PHOTO: usize = 5;
pub const MAX_TAG_LENGTH: usize = 50;

/// Normalizes raw tag input into a list of distinct titles
///
/// Every value may itself hold several comma-separated titles. Titles are
/// trimmed, blanks are dropped and duplicates keep their first position.
pub fn parse_tag_titles<S: AsRef<str>>(raw: &[S]) -> AppResult<Vec<String>> {
    let mut titles: Vec<String> = Vec::new();

    for value in raw {
        for title in value.as_ref().split(',').map(str::trim) {
            if title.is_empty() || titles.iter().any(|t| t == title) {
                continue;
            }
            if title.chars().count() > MAX_TAG_LENGTH {
                return Err(AppError::InvalidInput(format!(
                    "Tag '{}' is longer than {} characters",
                    title, MAX_TAG_LENGTH
                )));
            }
            titles.push(title.to_string());
        }
    }

    if titles.len() > MAX_TAGS_PER_PHOTO {
        return Err(AppError::InvalidInput(messages::TOO_MANY_HASHTAGS.to_string()));
    }

    Ok(titles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_and_trims() {
        let titles = parse_tag_titles(&["nature, sunset ,sea"]).unwrap();
        assert_eq!(titles, vec!["nature", "sunset", "sea"]);
    }

    #[test]
    fn test_multiple_fields_are_merged() {
        let titles = parse_tag_titles(&["nature", "sea,sky"]).unwrap();
        assert_eq!(titles, vec!["nature", "sea", "sky"]);
    }

    #[test]
    fn test_blank_and_duplicate_entries_dropped() {
        let titles = parse_tag_titles(&[" , nature,,nature ", "sea", "nature"]).unwrap();
        assert_eq!(titles, vec!["nature", "sea"]);
    }

    #[test]
    fn test_empty_input() {
        let empty: [&str; 0] = [];
        assert!(parse_tag_titles(&empty).unwrap().is_empty());
        assert!(parse_tag_titles(&[""]).unwrap().is_empty());
    }

    #[test]
    fn test_five_tags_allowed() {
        let titles = parse_tag_titles(&["a,b,c,d,e"]).unwrap();
        assert_eq!(titles.len(), 5);
    }

    #[test]
    fn test_six_tags_rejected() {
        let err = parse_tag_titles(&["a,b,c,d,e,f"]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(msg) if msg == messages::TOO_MANY_HASHTAGS));
    }

    #[test]
    fn test_duplicates_do_not_count_towards_limit() {
        let titles = parse_tag_titles(&["a,b,c,d,e,a,b"]).unwrap();
        assert_eq!(titles.len(), 5);
    }

    #[test]
    fn test_overlong_tag_rejected() {
        let long = "x".repeat(MAX_TAG_LENGTH + 1);
        assert!(parse_tag_titles(&[long]).is_err());
    }
}
