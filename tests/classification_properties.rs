use proptest::prelude::*;
use sortify::config::{CategoryRule, OTHERS, Routing};
use sortify::file_category::{classify, is_reserved};
use sortify::metadata::FileMetadata;

const EXTENSIONS: &[&str] = &[".jpg", ".png", ".pdf", ".txt", ".mp4", ".zip", ""];

fn extension() -> impl Strategy<Value = String> {
    prop::sample::select(EXTENSIONS).prop_map(str::to_string)
}

fn metadata() -> impl Strategy<Value = FileMetadata> {
    (extension(), 0.0f64..4.0, 1990i32..2040).prop_map(|(extension, size_gb, year)| {
        FileMetadata {
            extension,
            size_gb,
            year,
        }
    })
}

fn rule() -> impl Strategy<Value = CategoryRule> {
    (
        prop::collection::vec(extension(), 0..3),
        prop::option::of(0.0f64..2.0),
        prop::option::of(2.0f64..4.0),
        any::<bool>(),
    )
        .prop_map(|(extensions, min_gb, max_gb, year)| {
            let mut rule = CategoryRule::new("/dest");
            rule.extensions = extensions.into_iter().filter(|e| !e.is_empty()).collect();
            rule.min_gb = min_gb;
            rule.max_gb = max_gb;
            rule.year = year;
            rule
        })
}

fn routing() -> impl Strategy<Value = Routing> {
    prop::collection::vec(rule(), 0..6).prop_map(|rules| {
        rules
            .into_iter()
            .enumerate()
            .map(|(i, rule)| (format!("Category{}", i), rule))
            .chain(std::iter::once((OTHERS.to_string(), CategoryRule::new("/misc"))))
            .collect()
    })
}

proptest! {
    #[test]
    fn chosen_category_honors_its_extension_list(metadata in metadata(), routing in routing()) {
        let chosen = classify(&metadata, &routing);
        if chosen != OTHERS {
            let rule = routing.get(chosen).unwrap();
            if !rule.extensions.is_empty() {
                prop_assert!(
                    rule.extensions
                        .iter()
                        .any(|ext| ext.eq_ignore_ascii_case(&metadata.extension)),
                    "{} picked for {:?}", chosen, metadata.extension
                );
            }
        }
    }

    #[test]
    fn chosen_category_is_the_first_that_fits(metadata in metadata(), routing in routing()) {
        let chosen = classify(&metadata, &routing);

        let expected = routing
            .iter()
            .filter(|(name, _)| !is_reserved(name))
            .find(|(_, rule)| {
                let ext_ok = rule.extensions.is_empty()
                    || rule.extensions.contains(&metadata.extension);
                let min_ok = rule.min_gb.is_none_or(|min| metadata.size_gb >= min);
                let max_ok = rule.max_gb.is_none_or(|max| metadata.size_gb <= max);
                ext_ok && min_ok && max_ok
            })
            .map(|(name, _)| name)
            .unwrap_or(OTHERS);

        prop_assert_eq!(chosen, expected);
    }

    #[test]
    fn upper_case_extension_classifies_the_same(metadata in metadata(), routing in routing()) {
        let mut shouted = metadata.clone();
        shouted.extension = metadata.extension.to_uppercase();
        prop_assert_eq!(classify(&metadata, &routing), classify(&shouted, &routing));
    }

    #[test]
    fn year_never_changes_the_category(metadata in metadata(), routing in routing(), other in 1990i32..2040) {
        let mut moved_in_time = metadata.clone();
        moved_in_time.year = other;
        prop_assert_eq!(classify(&metadata, &routing), classify(&moved_in_time, &routing));
    }
}
