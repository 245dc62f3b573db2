//! Chain tests: end-to-end with mocks.
//!
//! Each test follows MOCK → FUNCTION → OUTPUT:
//! set up the fake model, search and classifier, call `run_pipeline`, assert
//! on the report that came out.

use std::sync::Arc;
use std::time::Duration;

use newscheck_agents::PromptKind;
use newscheck_common::file_config::{CorroborationMode, PipelineConfig};
use newscheck_common::{
    AlignmentLabel, Article, CorroborationCount, TopicCategory, VerdictCategory, VerdictSource,
};

use crate::testing::*;
use crate::PipelineStage;

const HEADLINE: &str = "El Gobierno prohíbe el pan de masa madre";
const BODY: &str = "Fuentes anónimas aseguran que el congreso votará mañana una ley sobre panaderías.";

const SUBJECT_REPLY: &str =
    r#"{"subject": "El Gobierno", "event": "prohíbe el pan de masa madre", "topic": "Politics"}"#;
const FAKE_REPLY: &str =
    r#"{"category": "Fake", "reasoning": "Ninguna fuente fiable lo confirma y el titular no corresponde al cuerpo."}"#;

fn scenario_model() -> ScriptedModel {
    ScriptedModel::new()
        .on(PromptKind::Filter, r#"{"times": 5}"#)
        .on(PromptKind::Headline, r#"{"label": "NotAligned"}"#)
        .on(PromptKind::Class, SUBJECT_REPLY)
        .on(PromptKind::Decision, FAKE_REPLY)
}

fn five_copies() -> StaticRetriever {
    StaticRetriever::with_snippets(&[HEADLINE; 5])
}

// ---------------------------------------------------------------------------
// Chain Test 1: the reference scenario
//
// domain 3, classifier 0.2, headline not aligned, headline found in 5
// outlets → Fake, produced by the decision agent.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn low_probability_misaligned_widely_copied_headline_is_fake() {
    let model = Arc::new(scenario_model());
    let veracity = Arc::new(FixedVeracity::new(0.2));
    let pipeline = test_pipeline(model.clone(), five_copies(), veracity.clone(), fast_config());

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    assert_eq!(report.verdict.category, VerdictCategory::Fake);
    assert_eq!(report.verdict_source, VerdictSource::Agent);
    assert!(report.degraded.is_empty(), "degraded: {:?}", report.degraded);

    let signal = report.veracity.value().unwrap();
    assert_eq!(signal.domain, 3);
    assert!(!signal.domain_substituted);
    assert!((signal.probability - 0.2).abs() < 1e-6);
    assert_eq!(veracity.seen_domains(), vec![3]);

    assert_eq!(report.alignment.value(), Some(&AlignmentLabel::NotAligned));
    assert_eq!(report.corroboration.value(), Some(&CorroborationCount { times: 5 }));
    assert_eq!(report.subject.value().unwrap().topic, TopicCategory::Politics);
    assert_eq!(report.context.value().unwrap().len(), 5);

    // the aggregator saw every signal
    let decision = model
        .requests()
        .into_iter()
        .find(|r| r.kind == PromptKind::Decision)
        .unwrap();
    assert!(decision.user.contains("0.2000"));
    assert!(decision.user.contains("NotAligned"));
    assert!(decision.user.contains("same headline: 5"));
    assert!(decision.user.contains("https://medio1.example/noticia"));
    assert!(!decision.user.contains("UNKNOWN"));
}

#[tokio::test]
async fn stages_are_traced_in_order() {
    let pipeline = test_pipeline(
        Arc::new(scenario_model()),
        five_copies(),
        Arc::new(FixedVeracity::new(0.2)),
        fast_config(),
    );
    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    let stages: Vec<PipelineStage> = report.stages.iter().map(|r| r.stage).collect();
    assert_eq!(
        stages,
        vec![
            PipelineStage::Start,
            PipelineStage::Preprocessed,
            PipelineStage::Scored,
            PipelineStage::ContextRetrieved,
            PipelineStage::SignalsComplete,
            PipelineStage::Verdicted,
            PipelineStage::Done,
        ]
    );
    assert!(report.started_at <= report.finished_at);
}

// ---------------------------------------------------------------------------
// Chain Test 2: malformed agent payload
//
// headline agent answers with prose → alignment degraded, the decision agent
// is told it is UNKNOWN, the run still reaches Done.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_payload_degrades_one_signal_and_run_completes() {
    let model = Arc::new(
        scenario_model().on(PromptKind::Headline, "The headline is aligned with the body."),
    );
    let pipeline = test_pipeline(
        model.clone(),
        five_copies(),
        Arc::new(FixedVeracity::new(0.2)),
        fast_config(),
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    assert_eq!(report.stages.last().unwrap().stage, PipelineStage::Done);
    assert!(report.alignment.is_degraded());
    assert_eq!(report.degraded, vec!["alignment".to_string()]);
    assert_eq!(report.verdict_source, VerdictSource::Agent);

    let decision = model
        .requests()
        .into_iter()
        .find(|r| r.kind == PromptKind::Decision)
        .unwrap();
    assert!(decision.user.contains("UNKNOWN (headline agent returned an unusable response"));
}

// ---------------------------------------------------------------------------
// Chain Test 3: decision agent down
//
// every signal computed but the decision call fails → deterministic fallback
// verdict, flagged as such.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_decision_agent_falls_back_to_signals() {
    let model = Arc::new(scenario_model().fail(PromptKind::Decision, "connection reset"));
    let pipeline = test_pipeline(
        model,
        five_copies(),
        Arc::new(FixedVeracity::new(0.2)),
        fast_config(),
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    assert_eq!(report.verdict_source, VerdictSource::Fallback);
    assert_eq!(report.verdict.category, VerdictCategory::Fake);
    assert!(!report.verdict.reasoning.is_empty());
    assert!(report.is_degraded());
}

#[tokio::test]
async fn fallback_with_clean_signals_is_real() {
    let model = Arc::new(
        ScriptedModel::new()
            .on(PromptKind::Filter, r#"{"times": 1}"#)
            .on(PromptKind::Headline, r#"{"label": "Aligned"}"#)
            .on(PromptKind::Class, SUBJECT_REPLY),
    );
    let pipeline = test_pipeline(
        model,
        StaticRetriever::with_snippets(&[HEADLINE, "otra noticia"]),
        Arc::new(FixedVeracity::new(0.9)),
        fast_config(),
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(1))
        .await
        .unwrap();

    assert_eq!(report.verdict_source, VerdictSource::Fallback);
    assert_eq!(report.verdict.category, VerdictCategory::Real);
}

// ---------------------------------------------------------------------------
// Chain Test 4: domains
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_domain_uses_default() {
    let veracity = Arc::new(FixedVeracity::new(0.6));
    let pipeline = test_pipeline(
        Arc::new(scenario_model()),
        five_copies(),
        veracity.clone(),
        fast_config(),
    );

    let report = pipeline.run_pipeline(&Article::new(HEADLINE, BODY)).await.unwrap();

    let signal = report.veracity.value().unwrap();
    assert!(signal.domain_substituted);
    assert_eq!(signal.domain, 0);
    assert_eq!(veracity.seen_domains(), vec![0]);
    assert_eq!(report.domain, None);
}

#[tokio::test]
async fn out_of_range_domain_uses_default() {
    let veracity = Arc::new(FixedVeracity::new(0.6));
    let pipeline = test_pipeline(
        Arc::new(scenario_model()),
        five_copies(),
        veracity.clone(),
        fast_config(),
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(40))
        .await
        .unwrap();

    assert!(report.veracity.value().unwrap().domain_substituted);
    assert_eq!(veracity.seen_domains(), vec![0]);
}

#[tokio::test]
async fn topic_conditions_domain_when_configured() {
    let veracity = Arc::new(FixedVeracity::new(0.6));
    let config = PipelineConfig {
        domain_from_topic: true,
        ..fast_config()
    };
    let pipeline = test_pipeline(
        Arc::new(scenario_model()),
        five_copies(),
        veracity.clone(),
        config,
    );

    let article = Article::new(
        "La inflación golpea los salarios",
        "Los mercados reaccionan a la inflación y los salarios pierden poder adquisitivo.",
    );
    let report = pipeline.run_pipeline(&article).await.unwrap();

    assert_eq!(report.topic.value().unwrap().topic_id, 1);
    assert_eq!(veracity.seen_domains(), vec![1]);
    assert!(!report.veracity.value().unwrap().domain_substituted);
}

#[tokio::test]
async fn article_domain_wins_over_topic() {
    let veracity = Arc::new(FixedVeracity::new(0.6));
    let config = PipelineConfig {
        domain_from_topic: true,
        ..fast_config()
    };
    let pipeline = test_pipeline(
        Arc::new(scenario_model()),
        five_copies(),
        veracity.clone(),
        config,
    );

    pipeline
        .run_pipeline(&Article::new("La inflación golpea los salarios", BODY).with_domain(7))
        .await
        .unwrap();

    assert_eq!(veracity.seen_domains(), vec![7]);
}

#[tokio::test]
async fn topic_follows_the_body_not_the_headline() {
    let veracity = Arc::new(FixedVeracity::new(0.6));
    let config = PipelineConfig {
        domain_from_topic: true,
        ..fast_config()
    };
    let pipeline = test_pipeline(
        Arc::new(scenario_model()),
        five_copies(),
        veracity.clone(),
        config,
    );

    let article = Article::new(
        "Gobierno, elecciones y congreso: gobierno y congreso ante las elecciones",
        "Inflación y salarios.",
    );
    let report = pipeline.run_pipeline(&article).await.unwrap();

    let from_body = pipeline.infer_topic(&article.body);
    assert_eq!(from_body.topic_id, 1);
    assert_eq!(report.topic.value().unwrap().topic_id, from_body.topic_id);
    assert_eq!(veracity.seen_domains(), vec![1]);
}

// ---------------------------------------------------------------------------
// Chain Test 5: context retrieval
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_search_degrades_context_and_corroboration() {
    let model = Arc::new(scenario_model());
    let pipeline = test_pipeline(
        model.clone(),
        StaticRetriever::failing("quota exceeded"),
        Arc::new(FixedVeracity::new(0.2)),
        fast_config(),
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    assert!(report.context.degraded_reason().unwrap().contains("quota exceeded"));
    assert!(report
        .corroboration
        .degraded_reason()
        .unwrap()
        .starts_with("context unavailable"));
    assert_eq!(model.calls(PromptKind::Filter), 0);
    assert_eq!(report.degraded, vec!["context".to_string(), "corroboration".to_string()]);
    assert_eq!(report.stages.last().unwrap().stage, PipelineStage::Done);
}

#[tokio::test]
async fn slow_search_times_out() {
    let pipeline = test_pipeline(
        Arc::new(scenario_model()),
        five_copies().delay(Duration::from_secs(3)),
        Arc::new(FixedVeracity::new(0.2)),
        fast_config(),
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    assert!(report.context.degraded_reason().unwrap().contains("timed out"));
}

#[tokio::test]
async fn no_results_means_zero_corroboration_without_filter_call() {
    let model = Arc::new(scenario_model());
    let pipeline = test_pipeline(
        model.clone(),
        StaticRetriever::with_snippets(&[]),
        Arc::new(FixedVeracity::new(0.2)),
        fast_config(),
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    assert_eq!(report.corroboration.value(), Some(&CorroborationCount { times: 0 }));
    assert_eq!(model.calls(PromptKind::Filter), 0);
    assert!(report.degraded.is_empty());
}

#[tokio::test]
async fn search_results_are_capped_by_config() {
    let config = PipelineConfig {
        search_results: 2,
        ..fast_config()
    };
    let pipeline = test_pipeline(
        Arc::new(scenario_model()),
        five_copies(),
        Arc::new(FixedVeracity::new(0.2)),
        config,
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    assert_eq!(report.context.value().unwrap().len(), 2);
    // the agent claimed 5, clamped to the 2 entries it was shown
    assert_eq!(report.corroboration.value(), Some(&CorroborationCount { times: 2 }));
}

// ---------------------------------------------------------------------------
// Chain Test 6: literal corroboration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn literal_mode_counts_locally() {
    let model = Arc::new(scenario_model());
    let config = PipelineConfig {
        corroboration_mode: CorroborationMode::Literal,
        ..fast_config()
    };
    let pipeline = test_pipeline(
        model.clone(),
        StaticRetriever::with_snippets(&[HEADLINE, "nada que ver", HEADLINE]),
        Arc::new(FixedVeracity::new(0.2)),
        config,
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    assert_eq!(report.corroboration.value(), Some(&CorroborationCount { times: 2 }));
    assert_eq!(model.calls(PromptKind::Filter), 0);
}

// ---------------------------------------------------------------------------
// Chain Test 7: agent timeout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_agent_degrades_only_its_signal() {
    let model = Arc::new(scenario_model().delay_on(PromptKind::Class, Duration::from_millis(1500)));
    let config = PipelineConfig {
        agent_timeout_secs: 1,
        ..fast_config()
    };
    let pipeline = test_pipeline(model, five_copies(), Arc::new(FixedVeracity::new(0.2)), config);

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();

    assert!(report.subject.degraded_reason().unwrap().contains("timed out"));
    assert_eq!(report.degraded, vec!["subject".to_string()]);
    assert_eq!(report.verdict_source, VerdictSource::Agent);
}

// ---------------------------------------------------------------------------
// Chain Test 8: report shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn report_serializes_signal_status() {
    let model = Arc::new(scenario_model().on(PromptKind::Class, "{}"));
    let pipeline = test_pipeline(
        model,
        five_copies(),
        Arc::new(FixedVeracity::new(0.2)),
        fast_config(),
    );

    let report = pipeline
        .run_pipeline(&Article::new(HEADLINE, BODY).with_domain(3))
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["verdict"]["category"], "Fake");
    assert_eq!(json["verdict_source"], "agent");
    assert_eq!(json["alignment"]["status"], "computed");
    assert_eq!(json["alignment"]["value"], "NotAligned");
    assert_eq!(json["subject"]["status"], "degraded");
    assert_eq!(json["stages"][6]["stage"], "done");
    assert!(json["run_id"].is_string());
}
