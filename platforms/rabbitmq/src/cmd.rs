use pmsg_common::{CommandError, PushError, PushResult, Step, StepExt, Validate, non_empty};

use crate::sink::{AmqpSink, DEFAULT_CONTENT_TYPE, LapinSink, PublishRequest};

/// 发布一条消息到 RabbitMQ
#[derive(Debug, Clone, Default)]
pub struct CmdRabbitmqPublishParams {
    pub url: String,
    pub exchange: String,
    pub routing_key: String,
    pub content_type: Option<String>,
    pub body: String,
    pub declare_queue: Option<String>,
    pub persistent: bool,
}

impl CmdRabbitmqPublishParams {
    pub fn build(&self) -> PublishRequest {
        PublishRequest {
            exchange: self.exchange.trim().to_string(),
            routing_key: self.routing_key.clone(),
            content_type: non_empty(self.content_type.clone())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            body: self.body.as_bytes().to_vec(),
            declare_queue: self.declare_queue.clone(),
            persistent: self.persistent,
        }
    }

    pub fn validate(&self) -> Result<(), PushError> {
        self.build().validate()
    }

    pub async fn run(&self) -> Result<PushResult, CommandError> {
        let sink = LapinSink::new(self.url.clone()).at(Step::Validate)?;
        self.run_with(&sink).await
    }

    pub async fn run_with(&self, sink: &dyn AmqpSink) -> Result<PushResult, CommandError> {
        self.validate().at(Step::Validate)?;
        let request = self.build();
        sink.publish(&request)
            .await
            .map_err(CommandError::dispatch)?;
        Ok(PushResult::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<PublishRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl AmqpSink for RecordingSink {
        async fn publish(&self, request: &PublishRequest) -> Result<(), PushError> {
            if self.fail {
                return Err(PushError::NetworkError("connection refused".to_string()));
            }
            self.published.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_publish_defaults() {
        let sink = RecordingSink::default();
        let params = CmdRabbitmqPublishParams {
            url: "amqp://localhost".to_string(),
            routing_key: "jobs".to_string(),
            body: "{\"id\":1}".to_string(),
            ..Default::default()
        };
        let result = params.run_with(&sink).await.unwrap();
        assert_eq!(result.to_string(), "ok");

        let published = sink.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].exchange, "");
        assert_eq!(published[0].content_type, "text/plain");
        assert_eq!(published[0].body, b"{\"id\":1}");
    }

    #[tokio::test]
    async fn test_missing_routing_key_publishes_nothing() {
        let sink = RecordingSink::default();
        let params = CmdRabbitmqPublishParams {
            url: "amqp://localhost".to_string(),
            body: "x".to_string(),
            ..Default::default()
        };
        let err = params.run_with(&sink).await.unwrap_err();
        assert_eq!(err.step, Step::Validate);
        assert!(sink.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_send_step() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let params = CmdRabbitmqPublishParams {
            url: "amqp://localhost".to_string(),
            exchange: "events".to_string(),
            content_type: Some("application/json".to_string()),
            body: "{}".to_string(),
            ..Default::default()
        };
        let err = params.run_with(&sink).await.unwrap_err();
        assert_eq!(err.step, Step::Send);
    }

    #[tokio::test]
    async fn test_bad_url_is_rejected() {
        let params = CmdRabbitmqPublishParams {
            url: "localhost:5672".to_string(),
            routing_key: "jobs".to_string(),
            ..Default::default()
        };
        let err = params.run().await.unwrap_err();
        assert_eq!(err.step, Step::Validate);
        assert_eq!(
            err.to_string(),
            "validate failed: invalid url: must start with amqp:// or amqps://"
        );
    }
}
