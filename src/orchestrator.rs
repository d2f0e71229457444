use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::bulk::BulkTranslator;
use crate::extract::{extract, ExclusionRules, TextTree};
use crate::language::Language;

/// Whole-structure translation: extract, one bulk pass, write back.
pub struct StructureTranslator {
    bulk: Arc<BulkTranslator>,
    rules: ExclusionRules,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureReport {
    /// Distinct translatable leaves found
    pub leaves: usize,
    /// Leaf occurrences whose text changed
    pub rewritten: usize,
}

impl StructureTranslator {
    pub fn new(bulk: Arc<BulkTranslator>, rules: ExclusionRules) -> Self {
        Self { bulk, rules }
    }

    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }

    /// Translate every leaf of `tree` in place.
    ///
    /// The tree must hold source-language text; use [`translate_copy`] to keep
    /// an untouched original around for later language switches.
    ///
    /// [`translate_copy`]: StructureTranslator::translate_copy
    pub async fn translate_in_place<T: TextTree>(&self, tree: &mut T, language: Language) -> StructureReport {
        let texts: Vec<String> = extract(&*tree, &self.rules).map(str::to_string).collect();
        let mut report = StructureReport {
            leaves: texts.len(),
            rewritten: 0,
        };
        if texts.is_empty() || language.is_identity() {
            return report;
        }

        let translations = self.bulk.translate(&texts, language).await;
        report.rewritten = tree.rewrite_texts(&self.rules, &mut |text| translations.get(text).cloned());

        info!(%language, leaves = report.leaves, rewritten = report.rewritten, "Structure translated");
        report
    }

    pub async fn translate_copy<T: TextTree + Clone>(&self, source: &T, language: Language) -> (T, StructureReport) {
        let mut copy = source.clone();
        let report = self.translate_in_place(&mut copy, language).await;
        (copy, report)
    }

    /// Re-translate `source` on every language switch until the signal closes.
    ///
    /// The current language is rendered first.
    pub async fn follow_language<T, F>(&self, source: &T, mut signal: watch::Receiver<Language>, mut sink: F)
    where
        T: TextTree + Clone,
        F: FnMut(T, Language),
    {
        loop {
            let language = *signal.borrow_and_update();
            let (translated, _) = self.translate_copy(source, language).await;
            sink(translated, language);

            if signal.changed().await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::cache::TranslationCache;
    use crate::config::BulkFailurePolicy;
    use crate::dictionary::OfflineDictionary;
    use crate::extract::RenderNode;
    use crate::inflight::InFlightRegistry;
    use crate::provider::TranslationProvider;
    use crate::test_utils::FakeProvider;
    use crate::translator::SingleTranslator;

    fn orchestrator(fake: Arc<FakeProvider>) -> StructureTranslator {
        let provider: Arc<dyn TranslationProvider> = fake;
        let single = Arc::new(SingleTranslator::new(
            Arc::new(TranslationCache::unbounded()),
            Arc::new(InFlightRegistry::new()),
            provider,
            Arc::new(OfflineDictionary::empty()),
            Duration::from_secs(10),
            3,
        ));
        let bulk = Arc::new(BulkTranslator::new(single, BulkFailurePolicy::NegativeCache));
        StructureTranslator::new(bulk, ExclusionRules::default())
    }

    #[tokio::test]
    async fn test_translates_every_matching_leaf() {
        let fake = Arc::new(FakeProvider::new());
        let translator = orchestrator(fake.clone());
        let mut page = RenderNode::element("form")
            .child(RenderNode::element("h1").child(RenderNode::text("Hello")))
            .child(RenderNode::element("button").attr("title", "Submit").child(RenderNode::text("Submit")))
            .child(RenderNode::element("script").child(RenderNode::text("Submit")));

        let report = translator.translate_in_place(&mut page, Language::Kannada).await;

        assert_eq!(report, StructureReport { leaves: 2, rewritten: 3 });
        assert_eq!(fake.batch_calls(), 1);
        assert_eq!(
            page,
            RenderNode::element("form")
                .child(RenderNode::element("h1").child(RenderNode::text("ನಮಸ್ಕಾರ")))
                .child(
                    RenderNode::element("button")
                        .attr("title", "ಸಲ್ಲಿಸಿ")
                        .child(RenderNode::text("ಸಲ್ಲಿಸಿ"))
                )
                .child(RenderNode::element("script").child(RenderNode::text("Submit")))
        );
    }

    #[tokio::test]
    async fn test_rerun_on_cached_tree_makes_no_calls() {
        let fake = Arc::new(FakeProvider::new());
        let translator = orchestrator(fake.clone());
        let form = json!({"title": "Hello", "options": ["Yes", "No"]});

        let (first, _) = translator.translate_copy(&form, Language::Kannada).await;
        let (second, _) = translator.translate_copy(&form, Language::Kannada).await;

        assert_eq!(first, second);
        assert_eq!(first, json!({"title": "ನಮಸ್ಕಾರ", "options": ["ಹೌದು", "ಇಲ್ಲ"]}));
        assert_eq!(fake.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_identity_language_leaves_tree_untouched() {
        let fake = Arc::new(FakeProvider::new());
        let translator = orchestrator(fake.clone());
        let mut form = json!({"title": "Hello"});

        let report = translator.translate_in_place(&mut form, Language::English).await;

        assert_eq!(report.rewritten, 0);
        assert_eq!(form, json!({"title": "Hello"}));
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_follows_language_switches() {
        let fake = Arc::new(FakeProvider::new());
        let translator = orchestrator(fake.clone());
        let form = json!({"label": "Yes"});
        let (tx, rx) = watch::channel(Language::English);

        let mut rendered = Vec::new();
        let follow = translator.follow_language(&form, rx, |tree, language| {
            rendered.push((language, tree["label"].as_str().unwrap_or_default().to_string()));
        });
        let drive = async {
            tokio::task::yield_now().await;
            tx.send(Language::Kannada).unwrap();
            tokio::task::yield_now().await;
            tx.send(Language::Hindi).unwrap();
            tokio::task::yield_now().await;
            drop(tx);
        };
        tokio::join!(follow, drive);

        assert_eq!(rendered.first(), Some(&(Language::English, "Yes".to_string())));
        assert_eq!(rendered.last(), Some(&(Language::Hindi, "[hi] Yes".to_string())));
    }
}
