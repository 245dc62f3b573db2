use std::collections::HashMap;

use newscheck_common::{HeadlineSubject, Signal};

use crate::agent::into_signal;
use crate::{AgentRunner, PromptKind};

/// Subject, event and field of a headline.
#[derive(Clone)]
pub struct SubjectClassifier {
    runner: AgentRunner,
}

impl SubjectClassifier {
    pub fn new(runner: AgentRunner) -> Self {
        Self { runner }
    }

    pub async fn classify(&self, headline: &str) -> Signal<HeadlineSubject> {
        let vars = HashMap::from([("headline", self.runner.clip(headline))]);
        into_signal(self.runner.invoke(PromptKind::Class, &vars).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use crate::PromptSet;
    use newscheck_common::TopicCategory;
    use std::sync::Arc;
    use std::time::Duration;

    fn classifier(model: ScriptedModel) -> SubjectClassifier {
        SubjectClassifier::new(AgentRunner::new(
            Arc::new(model),
            Arc::new(PromptSet::defaults().unwrap()),
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn classifies_headline() {
        let model = ScriptedModel::new().on(
            PromptKind::Class,
            r#"{"subject": "El Congreso", "event": "aprueba la ley de vivienda", "topic": "Politics"}"#,
        );
        let subject = classifier(model)
            .classify("El Congreso aprueba la ley de vivienda")
            .await
            .into_value()
            .unwrap();
        assert_eq!(subject.subject, "El Congreso");
        assert_eq!(subject.topic, TopicCategory::Politics);
    }

    #[tokio::test]
    async fn topic_outside_the_enumeration_degrades() {
        let model = ScriptedModel::new().on(
            PromptKind::Class,
            r#"{"subject": "Real Madrid", "event": "gana la liga", "topic": "Sports"}"#,
        );
        assert!(classifier(model).classify("El Real Madrid gana la liga").await.is_degraded());
    }

    #[tokio::test]
    async fn transport_failure_degrades() {
        let model = ScriptedModel::new().fail(PromptKind::Class, "connection reset");
        let signal = classifier(model).classify("Titular").await;
        assert!(signal.degraded_reason().unwrap().contains("connection reset"));
    }
}
