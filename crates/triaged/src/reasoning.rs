//! Reasoning service client.
//!
//! Trait seam with a real HTTP implementation (OpenAI-compatible chat
//! completions) and a scripted fake for tests. The request is built
//! deterministically from patient, resources, and guidelines; the response
//! must be strict JSON matching the decision shape or the call fails with a
//! parse error and the pipeline falls back.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};
use triage_common::{
    ChatMessage, ChatRequest, ChatResponse, PatientRecord, ReasoningError, ResourceSnapshot,
    ResponseFormat, TriageDecision,
};

const SYSTEM_PROMPT: &str = "You are a hospital triage assistant. Respond with valid JSON only, \
matching exactly this shape: \
{\"patient_summary\":{\"id\":\"...\",\"name\":\"...\"},\
\"triage\":{\"priority\":\"Low|Medium|High|Critical\",\"reasoning\":\"...\"},\
\"resource_decision\":{\"icu_required\":\"Yes|No\",\"icu_assigned\":\"...\",\
\"doctor_assigned\":\"...\",\"nurse_assigned\":\"...\"},\
\"alerts\":{\"level\":\"Normal|Urgent\",\"message\":\"...\"}}";

/// Decision provider boundary. The pipeline only sees this trait, so the
/// integration tests drive it with a scripted fake.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn decide(
        &self,
        patient: &PatientRecord,
        guidelines: &str,
        resources: &ResourceSnapshot,
    ) -> Result<TriageDecision, ReasoningError>;
}

/// Build the user prompt. Pure function of its inputs: identical inputs
/// produce identical text (vitals/labs maps are ordered).
pub fn build_user_prompt(
    patient: &PatientRecord,
    guidelines: &str,
    resources: &ResourceSnapshot,
) -> String {
    format!(
        "GUIDELINES:\n{guidelines}\n\n\
         CURRENT RESOURCES:\n\
         ICU Beds Available: {icu} of {icu_total}\n\
         General Wards Available: {wards} of {wards_total}\n\
         Doctors On Call: {doctors}\n\
         Nurses Available: {nurses}\n\n\
         PATIENT:\n\
         ID: {id}\n\
         Name: {name}\n\
         Symptoms: {symptoms}\n\
         Vitals: {vitals}\n\
         Labs: {labs}\n\n\
         TASK:\n\
         Perform triage, resource allocation, and alerting based on the \
         guidelines and resources.",
        guidelines = guidelines,
        icu = resources.icu_beds_available,
        icu_total = resources.icu_beds_total,
        wards = resources.general_wards_available,
        wards_total = resources.general_wards_total,
        doctors = resources.doctors_on_call.names().join(", "),
        nurses = resources.nurses_available,
        id = patient.id,
        name = patient.name,
        symptoms = patient.symptoms,
        vitals = serde_json::to_string(&patient.vitals).unwrap_or_default(),
        labs = serde_json::to_string(&patient.labs).unwrap_or_default(),
    )
}

/// Strict parse of the service's content into a decision. Any deviation
/// from the expected shape is a parse error, never coerced.
pub fn parse_decision(content: &str) -> Result<TriageDecision, ReasoningError> {
    serde_json::from_str(content)
        .map_err(|e| ReasoningError::Parse(format!("decision JSON invalid: {}", e)))
}

/// HTTP client against an OpenAI-compatible endpoint.
pub struct HttpReasoningClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    enabled: bool,
    timeout_secs: u64,
}

impl HttpReasoningClient {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        enabled: bool,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            enabled,
            timeout_secs,
        })
    }

    fn build_request(
        &self,
        patient: &PatientRecord,
        guidelines: &str,
        resources: &ResourceSnapshot,
    ) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_user_prompt(patient, guidelines, resources)),
            ],
            temperature: 0.0,
            response_format: ResponseFormat::json_object(),
        }
    }
}

#[async_trait]
impl ReasoningClient for HttpReasoningClient {
    async fn decide(
        &self,
        patient: &PatientRecord,
        guidelines: &str,
        resources: &ResourceSnapshot,
    ) -> Result<TriageDecision, ReasoningError> {
        // Credential/config absence short-circuits before any call attempt.
        if !self.enabled {
            return Err(ReasoningError::Unavailable(
                "reasoning disabled in configuration".to_string(),
            ));
        }
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ReasoningError::Unavailable("no API key configured".to_string())
        })?;

        let url = format!("{}/v1/chat/completions", self.endpoint);
        let request = self.build_request(patient, guidelines, resources);
        debug!("Reasoning call for patient {} via {}", patient.id, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasoningError::Request(format!(
                        "timeout after {}s",
                        self.timeout_secs
                    ))
                } else {
                    ReasoningError::Request(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Request(format!(
                "HTTP {} from reasoning service: {}",
                status, body
            )));
        }

        // Body-read failures are transport problems; only a body that
        // arrived intact but does not decode is a parse failure.
        let chat: ChatResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                ReasoningError::Parse(format!("response envelope invalid: {}", e))
            } else {
                ReasoningError::Request(format!("failed to read response body: {}", e))
            }
        })?;

        let content = chat
            .content()
            .ok_or_else(|| ReasoningError::Parse("empty response".to_string()))?;

        let decision = parse_decision(content)?;
        info!(
            "Reasoning decided for patient {}: {}",
            patient.id,
            decision.triage.priority.as_str()
        );
        Ok(decision)
    }
}

/// Scripted client for tests: returns the queued results in order, repeating
/// the last one when only a single result is scripted.
pub struct FakeReasoningClient {
    results: Mutex<Vec<Result<TriageDecision, ReasoningError>>>,
    call_count: Mutex<usize>,
}

impl FakeReasoningClient {
    pub fn new(results: Vec<Result<TriageDecision, ReasoningError>>) -> Self {
        Self {
            results: Mutex::new(results),
            call_count: Mutex::new(0),
        }
    }

    pub fn always_ok(decision: TriageDecision) -> Self {
        Self::new(vec![Ok(decision)])
    }

    pub fn always_err(error: ReasoningError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl ReasoningClient for FakeReasoningClient {
    async fn decide(
        &self,
        _patient: &PatientRecord,
        _guidelines: &str,
        _resources: &ResourceSnapshot,
    ) -> Result<TriageDecision, ReasoningError> {
        *self.call_count.lock().unwrap() += 1;

        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            return Err(ReasoningError::Unavailable(
                "no scripted result".to_string(),
            ));
        }
        if results.len() == 1 {
            results[0].clone()
        } else {
            results.remove(0)
        }
    }
}
