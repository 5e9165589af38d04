// src/models/batch.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

// ---
// Validações customizadas
// ---
fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("Weight must be greater than zero.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.message = Some("Purity must be between 0 and 100.".into());
        return Err(err);
    }
    Ok(())
}

/// Remove espaços e trata texto vazio como ausente.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Rótulo legível do n-ésimo lote de um registrante.
pub fn batch_label(n: i32) -> String {
    format!("BATCH-{}", n)
}

// --- Trecho do transporte: quem tinha a custódia ao registrar ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "transport_leg", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransportLeg {
    Miner,
    Dealer,
}

// --- O lote: cinco blocos de etapa, cada um com seu timestamp de conclusão ---
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Batch {
    #[schema(example = 42)]
    pub id: i32,
    pub user_id: i32,

    // 1. Registro
    /// Rótulo legível, sequencial por registrante (`BATCH-<n>`).
    #[serde(rename = "batch_id")]
    #[sqlx(rename = "batch_id")]
    #[schema(example = "BATCH-1")]
    pub label: String,
    pub mine_id: i32,
    #[schema(value_type = String, example = "2024-01-01")]
    pub date_collected: NaiveDate,
    #[schema(value_type = f64, example = 12.5)]
    pub weight_kg: Decimal,
    pub origin_cert_image_url: String,
    pub created_at: DateTime<Utc>,

    // 2. Recebimento pelo dealer
    pub dealer_received_at: Option<DateTime<Utc>>,
    pub dealer_location: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub dealer_received_weight: Option<Decimal>,
    pub dealer_receipt_id: Option<String>,
    pub dealer_license_image_url: Option<String>,

    // 3. Transporte
    pub transport_shipped_at: Option<DateTime<Utc>>,
    pub transport_leg: Option<TransportLeg>,
    pub transport_courier: Option<String>,
    pub transport_tracking_number: Option<String>,
    pub transport_origin_location: Option<String>,
    pub transport_destination_location: Option<String>,

    // 4. Entrada na autoridade
    pub goldbod_intake_at: Option<DateTime<Utc>>,
    pub goldbod_intake_officer: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub goldbod_intake_weight: Option<Decimal>,
    pub goldbod_intake_receipt_id: Option<String>,

    // 5. Ensaio
    pub assay_completed_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<f64>)]
    pub purity_percent: Option<Decimal>,
    pub assay_report_pdf_url: Option<String>,

    /// Versão para compare-and-swap; incrementa a cada escrita de etapa.
    pub version: i32,
}

/// Linha a inserir no registro; o rótulo é alocado pelo repositório.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub user_id: i32,
    pub mine_id: i32,
    pub date_collected: NaiveDate,
    pub weight_kg: Decimal,
    pub origin_cert_image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Escrita atômica de uma etapa: timestamp + todos os campos do bloco.
#[derive(Debug, Clone, PartialEq)]
pub enum StageWrite {
    DealerReceipt {
        at: DateTime<Utc>,
        location: String,
        received_weight: Decimal,
        receipt_id: String,
        // None mantém a licença já gravada
        license_image_url: Option<String>,
    },
    Transport {
        at: DateTime<Utc>,
        leg: TransportLeg,
        courier: String,
        tracking_number: String,
        origin_location: String,
        destination_location: String,
    },
    AuthorityIntake {
        at: DateTime<Utc>,
        officer: String,
        weight: Decimal,
        receipt_id: String,
    },
    Assay {
        at: DateTime<Utc>,
        purity_percent: Decimal,
        report_pdf_url: String,
    },
}

impl StageWrite {
    pub fn stage_name(&self) -> &'static str {
        match self {
            StageWrite::DealerReceipt { .. } => "dealer_receipt",
            StageWrite::Transport { .. } => "transport",
            StageWrite::AuthorityIntake { .. } => "goldbod_intake",
            StageWrite::Assay { .. } => "assay",
        }
    }

    /// Aplica a escrita numa cópia em memória do lote (usado pelo store em memória).
    pub fn apply_to(&self, batch: &mut Batch) {
        match self.clone() {
            StageWrite::DealerReceipt {
                at,
                location,
                received_weight,
                receipt_id,
                license_image_url,
            } => {
                batch.dealer_received_at = Some(at);
                batch.dealer_location = Some(location);
                batch.dealer_received_weight = Some(received_weight);
                batch.dealer_receipt_id = Some(receipt_id);
                if license_image_url.is_some() {
                    batch.dealer_license_image_url = license_image_url;
                }
            }
            StageWrite::Transport {
                at,
                leg,
                courier,
                tracking_number,
                origin_location,
                destination_location,
            } => {
                batch.transport_shipped_at = Some(at);
                batch.transport_leg = Some(leg);
                batch.transport_courier = Some(courier);
                batch.transport_tracking_number = Some(tracking_number);
                batch.transport_origin_location = Some(origin_location);
                batch.transport_destination_location = Some(destination_location);
            }
            StageWrite::AuthorityIntake {
                at,
                officer,
                weight,
                receipt_id,
            } => {
                batch.goldbod_intake_at = Some(at);
                batch.goldbod_intake_officer = Some(officer);
                batch.goldbod_intake_weight = Some(weight);
                batch.goldbod_intake_receipt_id = Some(receipt_id);
            }
            StageWrite::Assay {
                at,
                purity_percent,
                report_pdf_url,
            } => {
                batch.assay_completed_at = Some(at);
                batch.purity_percent = Some(purity_percent);
                batch.assay_report_pdf_url = Some(report_pdf_url);
            }
        }
        batch.version += 1;
    }
}

// =============================================================================
//  PAYLOADS
// =============================================================================

// Campos de texto do POST /batches (multipart, junto com o arquivo `origin_cert`)
#[derive(Debug, Validate, ToSchema)]
pub struct RegisterBatchForm {
    #[validate(required(message = "mine_id is required."))]
    #[schema(example = 1)]
    pub mine_id: Option<i32>,

    #[validate(required(message = "date_collected is required."))]
    #[schema(value_type = Option<String>, example = "2024-01-01")]
    pub date_collected: Option<NaiveDate>,

    #[validate(required(message = "weight_kg is required."), custom(function = "validate_positive"))]
    #[schema(value_type = Option<f64>, example = 12.5)]
    pub weight_kg: Option<Decimal>,
}

// PATCH /batches/{id}/dealer-receive (multipart, `dealer_license` opcional)
#[derive(Debug, Validate, ToSchema)]
pub struct DealerReceiptForm {
    #[validate(
        required(message = "dealer_location is required."),
        length(max = 255, message = "Too long.")
    )]
    pub dealer_location: Option<String>,

    #[validate(
        required(message = "dealer_received_weight is required."),
        custom(function = "validate_positive")
    )]
    #[schema(value_type = Option<f64>, example = 12.4)]
    pub dealer_received_weight: Option<Decimal>,

    #[validate(
        required(message = "dealer_receipt_id is required."),
        length(max = 255, message = "Too long.")
    )]
    pub dealer_receipt_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransportPayload {
    #[validate(
        required(message = "transport_courier is required."),
        length(max = 255, message = "Too long.")
    )]
    #[schema(example = "DHL")]
    pub transport_courier: Option<String>,

    #[validate(
        required(message = "transport_tracking_number is required."),
        length(max = 255, message = "Too long.")
    )]
    pub transport_tracking_number: Option<String>,

    #[validate(
        required(message = "transport_origin_location is required."),
        length(max = 255, message = "Too long.")
    )]
    pub transport_origin_location: Option<String>,

    #[validate(
        required(message = "transport_destination_location is required."),
        length(max = 255, message = "Too long.")
    )]
    pub transport_destination_location: Option<String>,
}

impl TransportPayload {
    pub fn trimmed(self) -> Self {
        Self {
            transport_courier: clean(self.transport_courier),
            transport_tracking_number: clean(self.transport_tracking_number),
            transport_origin_location: clean(self.transport_origin_location),
            transport_destination_location: clean(self.transport_destination_location),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GoldbodIntakePayload {
    #[validate(
        required(message = "goldbod_intake_officer is required."),
        length(max = 255, message = "Too long.")
    )]
    pub goldbod_intake_officer: Option<String>,

    #[validate(
        required(message = "goldbod_intake_weight is required."),
        custom(function = "validate_positive")
    )]
    #[schema(value_type = Option<f64>, example = 12.3)]
    pub goldbod_intake_weight: Option<Decimal>,

    #[validate(
        required(message = "goldbod_intake_receipt_id is required."),
        length(max = 255, message = "Too long.")
    )]
    pub goldbod_intake_receipt_id: Option<String>,
}

impl GoldbodIntakePayload {
    pub fn trimmed(self) -> Self {
        Self {
            goldbod_intake_officer: clean(self.goldbod_intake_officer),
            goldbod_intake_weight: self.goldbod_intake_weight,
            goldbod_intake_receipt_id: clean(self.goldbod_intake_receipt_id),
        }
    }
}

// PATCH /batches/{id}/assay (multipart, `assay_report` obrigatório)
#[derive(Debug, Validate, ToSchema)]
pub struct AssayForm {
    #[validate(
        required(message = "purity_percent is required."),
        custom(function = "validate_percentage")
    )]
    #[schema(value_type = Option<f64>, example = 91.6)]
    pub purity_percent: Option<Decimal>,
}
