// src/services/lifecycle.rs
//
// Máquina de estados do lote. O banco guarda só timestamps anuláveis;
// aqui eles viram um estado explícito e toda regra de transição fica
// num único lugar.

use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    models::{
        auth::Role,
        batch::{Batch, TransportLeg},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Registered,
    DealerReceived,
    InTransit,
    AuthorityIntake,
    Assayed,
}

/// Quem tem a custódia física: muda de mãos no recebimento pelo dealer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Custody {
    Miner,
    Dealer,
}

impl Custody {
    pub fn leg(&self) -> TransportLeg {
        match self {
            Custody::Miner => TransportLeg::Miner,
            Custody::Dealer => TransportLeg::Dealer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchState {
    pub stage: Stage,
    pub custody: Custody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    DealerReceipt,
    Transport,
    AuthorityIntake,
    Assay,
}

impl StageEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StageEvent::DealerReceipt => "dealer_receipt",
            StageEvent::Transport => "transport",
            StageEvent::AuthorityIntake => "goldbod_intake",
            StageEvent::Assay => "assay",
        }
    }
}

/// A posição do chamador em relação a um lote específico.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub role: Role,
    pub is_registrant: bool,
    pub accepted_dealer: bool,
    pub accepted_goldbod: bool,
}

impl Batch {
    pub fn custody(&self) -> Custody {
        if self.dealer_received_at.is_some() {
            Custody::Dealer
        } else {
            Custody::Miner
        }
    }

    pub fn state(&self) -> BatchState {
        let custody = self.custody();

        let stage = if self.assay_completed_at.is_some() {
            Stage::Assayed
        } else if self.goldbod_intake_at.is_some() {
            Stage::AuthorityIntake
        } else if self.transport_shipped_at.is_some()
            && (custody == Custody::Miner || self.transport_leg == Some(TransportLeg::Dealer))
        {
            Stage::InTransit
        } else if self.dealer_received_at.is_some() {
            // Transporte do minerador já foi superado pelo recebimento
            Stage::DealerReceived
        } else {
            Stage::Registered
        };

        BatchState { stage, custody }
    }

    /// O timestamp mais recente entre as etapas concluídas.
    pub fn latest_stamp(&self) -> DateTime<Utc> {
        [
            self.dealer_received_at,
            self.transport_shipped_at,
            self.goldbod_intake_at,
            self.assay_completed_at,
        ]
        .into_iter()
        .flatten()
        .fold(self.created_at, |latest, stamp| latest.max(stamp))
    }

    /// Timestamp para a próxima etapa: nunca anterior ao que já foi gravado.
    pub fn next_stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.latest_stamp())
    }

    /// created ≤ dealer ≤ transporte (trecho do dealer) ≤ entrada ≤ ensaio.
    /// O trecho do minerador antecede o recebimento e fica fora da cadeia.
    pub fn stage_timestamps_ordered(&self) -> bool {
        let transport = match self.transport_leg {
            Some(TransportLeg::Miner) if self.dealer_received_at.is_some() => None,
            _ => self.transport_shipped_at,
        };

        let chain: Vec<DateTime<Utc>> = [
            Some(self.created_at),
            self.dealer_received_at,
            transport,
            self.goldbod_intake_at,
            self.assay_completed_at,
        ]
        .into_iter()
        .flatten()
        .collect();

        chain.windows(2).all(|w| w[0] <= w[1])
    }

    /// Um bloco nunca fica parcialmente preenchido com o timestamp nulo.
    pub fn stage_blocks_consistent(&self) -> bool {
        let dealer = [
            self.dealer_location.is_some(),
            self.dealer_received_weight.is_some(),
            self.dealer_receipt_id.is_some(),
        ];
        let transport = [
            self.transport_leg.is_some(),
            self.transport_courier.is_some(),
            self.transport_tracking_number.is_some(),
            self.transport_origin_location.is_some(),
            self.transport_destination_location.is_some(),
        ];
        let intake = [
            self.goldbod_intake_officer.is_some(),
            self.goldbod_intake_weight.is_some(),
            self.goldbod_intake_receipt_id.is_some(),
        ];
        let assay = [
            self.purity_percent.is_some(),
            self.assay_report_pdf_url.is_some(),
        ];

        let block_ok = |done: bool, fields: &[bool]| fields.iter().all(|f| *f == done);

        block_ok(self.dealer_received_at.is_some(), &dealer)
            && block_ok(self.transport_shipped_at.is_some(), &transport)
            && block_ok(self.goldbod_intake_at.is_some(), &intake)
            && block_ok(self.assay_completed_at.is_some(), &assay)
    }
}

// ---
// A função de transição: (estado, evento, ator) -> novo estado
// ---
// A autorização é verificada antes da ordem das etapas: quem não é o ator
// autorizado recebe Forbidden em qualquer estado.
pub fn transition(
    state: BatchState,
    event: StageEvent,
    actor: &Standing,
) -> Result<BatchState, AppError> {
    match event {
        StageEvent::DealerReceipt => {
            if actor.role != Role::Dealer {
                return Err(AppError::forbidden("Only dealers can update this step."));
            }
            if !actor.accepted_dealer {
                return Err(AppError::forbidden("No accepted invitation for this dealer."));
            }
            match (state.stage, state.custody) {
                (Stage::Registered | Stage::InTransit, Custody::Miner) => Ok(BatchState {
                    stage: Stage::DealerReceived,
                    custody: Custody::Dealer,
                }),
                _ => Err(AppError::conflict(
                    "Dealer receipt has already been recorded for this batch.",
                )),
            }
        }

        StageEvent::Transport => {
            match state.custody {
                Custody::Miner => {
                    if actor.role != Role::Asm || !actor.is_registrant {
                        return Err(AppError::forbidden(
                            "Only the registering ASM can update transport before the dealer step.",
                        ));
                    }
                }
                Custody::Dealer => {
                    if actor.role != Role::Dealer || !actor.accepted_dealer {
                        return Err(AppError::forbidden(
                            "Only the accepted dealer can update transport after the dealer step.",
                        ));
                    }
                }
            }
            match state.stage {
                Stage::AuthorityIntake | Stage::Assayed => Err(AppError::conflict(
                    "Transport can no longer change after authority intake.",
                )),
                _ => Ok(BatchState {
                    stage: Stage::InTransit,
                    custody: state.custody,
                }),
            }
        }

        StageEvent::AuthorityIntake => {
            require_accepted_goldbod(actor)?;
            match state.stage {
                Stage::InTransit => Ok(BatchState {
                    stage: Stage::AuthorityIntake,
                    custody: state.custody,
                }),
                Stage::Registered | Stage::DealerReceived => Err(AppError::conflict(
                    "Transport must be recorded before authority intake.",
                )),
                Stage::AuthorityIntake | Stage::Assayed => Err(AppError::conflict(
                    "Authority intake has already been recorded for this batch.",
                )),
            }
        }

        StageEvent::Assay => {
            require_accepted_goldbod(actor)?;
            match state.stage {
                Stage::AuthorityIntake => Ok(BatchState {
                    stage: Stage::Assayed,
                    custody: state.custody,
                }),
                Stage::Assayed => Err(AppError::conflict(
                    "Assay has already been completed for this batch.",
                )),
                _ => Err(AppError::conflict(
                    "Authority intake must be recorded before assay.",
                )),
            }
        }
    }
}

fn require_accepted_goldbod(actor: &Standing) -> Result<(), AppError> {
    if actor.role != Role::Goldbod {
        return Err(AppError::forbidden("Only goldbod can update this step."));
    }
    if !actor.accepted_goldbod {
        return Err(AppError::forbidden("No accepted invitation for this goldbod."));
    }
    Ok(())
}
