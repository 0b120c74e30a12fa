//! Wire types for the MESA API
//!
//! These mirror the backend's schemas: string enums serialize as snake_case
//! tokens, and optional request fields are omitted rather than sent as null.

use serde::{Deserialize, Serialize};

// ===== Symptoms =====

/// Severity grading for a reported symptom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymptomSeverity {
    Mild,
    Moderate,
    Severe,
}

/// Recognized fever patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeverPattern {
    Cyclical,
    Stepladder,
    Continuous,
    Irregular,
}

/// A single reported symptom
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symptom {
    /// Symptom name, e.g. "fever" or "diarrhea"
    pub name: String,
    /// Whether the symptom is present (backend defaults to true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<SymptomSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<FeverPattern>,
    /// Additional details, e.g. "rice_water" for diarrhea
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Symptom {
    /// A present symptom with no qualifiers
    pub fn present(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            present: Some(true),
            severity: None,
            duration_days: None,
            pattern: None,
            description: None,
        }
    }
}

/// Selectable options for a symptom in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Vec<FeverPattern>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Vec<SymptomSeverity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<String>>,
}

/// Catalog entry describing a symptom the expert system accepts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub options: Option<SymptomOptions>,
}

// ===== Patient =====

/// Patient demographics and exposure history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_child: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pregnant: Option<bool>,
    /// Recent travel to an endemic area (within 30 days)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_endemic_area: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endemic_resident: Option<bool>,
    /// Consumed unboiled or untreated water
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsafe_water: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_food: Option<bool>,
    /// Contact with a confirmed cholera/typhoid/malaria case
    #[serde(skip_serializing_if = "Option::is_none")]
    pub household_contact: Option<bool>,
}

// ===== Lab results =====

/// Laboratory test identifiers the backend understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabTestType {
    BloodSmear,
    RdtMalaria,
    StoolCulture,
    RdtCholera,
    BloodCulture,
    Widal,
    Typhidot,
}

/// Outcome of a laboratory test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabResultValue {
    Positive,
    Negative,
    Pending,
}

/// A single laboratory result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabResult {
    pub test: LabTestType,
    pub result: LabResultValue,
    /// Additional details, e.g. species or a titer like "1:320"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ===== Dehydration assessment =====

/// Signs assessed for dehydration grading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DehydrationSignType {
    MentalState,
    Eyes,
    SkinPinch,
    Thirst,
}

/// An observed dehydration sign.
///
/// The finding vocabulary depends on the sign (e.g. mental_state:
/// alert/restless/lethargic/unconscious; skin_pinch: normal/slow/very_slow),
/// so it stays a free string like the backend schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DehydrationSign {
    pub sign: DehydrationSignType,
    pub finding: String,
}

// ===== Diagnosis =====

/// Request body of the diagnose endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub symptoms: Vec<Symptom>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_results: Option<Vec<LabResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dehydration_signs: Option<Vec<DehydrationSign>>,
}

/// Confidence level attached to a diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisConfidence {
    Confirmed,
    Confident,
    Suspect,
    Uncertain,
}

/// WHO dehydration grading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DehydrationLevel {
    None,
    Some,
    Severe,
}

/// WHO rehydration treatment plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreatmentPlan {
    A,
    B,
    C,
}

/// One entry of the ranked differential diagnosis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub disease: String,
    pub confidence: DiagnosisConfidence,
    pub reason: String,
    pub severity: Option<String>,
    pub recommendation: Option<String>,
}

/// Response body of the diagnose endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisResponse {
    pub diagnoses: Vec<Diagnosis>,
    pub recommendations: Vec<String>,
    pub dehydration_level: DehydrationLevel,
    pub treatment_plan: TreatmentPlan,
    pub disclaimer: String,
}

/// Catalog entry describing a disease the expert system can diagnose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseInfo {
    pub name: String,
    pub description: String,
    pub key_symptoms: Vec<String>,
    pub pathognomonic_signs: Vec<String>,
}

// ===== Chat =====

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// A single message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request body of the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub include_expert_context: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_context: Option<PatientInfo>,
}

impl ChatRequest {
    /// A chat turn with expert context enabled and no history
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_history: Vec::new(),
            model: None,
            include_expert_context: true,
            patient_context: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_patient_context(mut self, patient: PatientInfo) -> Self {
        self.patient_context = Some(patient);
        self
    }
}

/// Response body of the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub model_used: String,
    /// Updated history including this exchange
    pub conversation_history: Vec<ChatMessage>,
    pub extracted_symptoms: Option<Vec<String>>,
    pub suggested_diseases: Option<Vec<String>>,
}

// ===== Models =====

/// Information about an available LLM model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub context_window: u32,
}

/// Response body of the models endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default_model: String,
    pub current_model: Option<String>,
}

/// Request body of the model validation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelValidationRequest {
    pub model: String,
}

/// Response body of the model validation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelValidationResponse {
    pub model: String,
    pub valid: bool,
    pub available_models: Option<Vec<String>>,
}

// ===== API info =====

/// Reported operational status of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Operational,
    Degraded,
    Down,
}

/// Endpoint roots advertised by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoints {
    pub expert: String,
    pub chat: String,
}

/// Response body of the root endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub status: ApiStatus,
    pub docs: String,
    pub endpoints: ApiEndpoints,
}

/// Response body of the ping endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}

/// Symptom names the expert system accepts
pub const VALID_SYMPTOMS: &[&str] = &[
    "fever",
    "chills",
    "sweating",
    "diarrhea",
    "vomiting",
    "dehydration",
    "headache",
    "abdominal_pain",
    "severe_abdominal_pain",
    "constipation",
    "bitter_taste",
    "rose_spots",
    "relative_bradycardia",
    "altered_consciousness",
    "convulsions",
    "body_aches",
    "dark_urine",
    "anemia",
    "melena",
    "bloody_stool",
];
