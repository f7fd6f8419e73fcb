// Slug derivation for shareable links

use crate::store::{Store, StoreResult};

/// Lowercases the title, collapses runs of non-alphanumerics into a single
/// hyphen, and trims leading/trailing hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true; // suppress a leading hyphen
    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Derives a slug from the title, probing existing slugs and appending `-1`,
/// `-2`, ... until free.
///
/// The probe-then-insert sequence is not atomic; two concurrent creations
/// with the same title can both claim the same slug.
pub async fn unique_slug(store: &dyn Store, title: &str) -> StoreResult<String> {
    let base = slugify(title);
    let mut slug = base.clone();
    let mut counter = 1;
    while store.link_by_slug(&slug).await?.is_some() {
        slug = format!("{base}-{counter}");
        counter += 1;
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShareableLink;
    use crate::store::MemoryStore;

    #[test]
    fn punctuation_collapses_to_single_hyphens() {
        assert_eq!(slugify("Support My Work!!!"), "support-my-work");
        assert_eq!(slugify("  Hello,   World  "), "hello-world");
        assert_eq!(slugify("Already-Slugged"), "already-slugged");
        assert_eq!(slugify("!!!"), "");
    }

    #[tokio::test]
    async fn collisions_get_numeric_suffixes() {
        let store = MemoryStore::new();

        let first = unique_slug(&store, "Support My Work!!!").await.unwrap();
        assert_eq!(first, "support-my-work");
        store
            .insert_link(ShareableLink::new(
                first,
                "Support My Work!!!".into(),
                None,
                None,
                None,
                "c1".into(),
            ))
            .await
            .unwrap();

        let second = unique_slug(&store, "Support My Work!!!").await.unwrap();
        assert_eq!(second, "support-my-work-1");
        store
            .insert_link(ShareableLink::new(
                second,
                "Support My Work!!!".into(),
                None,
                None,
                None,
                "c1".into(),
            ))
            .await
            .unwrap();

        let third = unique_slug(&store, "Support My Work!!!").await.unwrap();
        assert_eq!(third, "support-my-work-2");
    }
}
