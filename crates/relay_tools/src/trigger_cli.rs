#![forbid(unsafe_code)]

use relay_kernel_contracts::intent::TransactionIntent;
use relay_os::capabilities::{IntentSubmitter, SubmitError};
use relay_os::recipient::{describe_intent, resolve_intent};
use relay_os::voice_session::VoiceTurnOutcome;
use relay_storage::contacts::ContactDirectory;

/// The form path: every field typed in, recipients may still be contact names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerForm {
    SendMoney {
        amount: String,
        to: String,
    },
    Pochi {
        amount: String,
        to: String,
    },
    Till {
        amount: String,
        till: String,
    },
    Paybill {
        amount: String,
        business: String,
        account: String,
    },
    Withdraw {
        amount: String,
        agent: String,
        store: String,
    },
}

impl TriggerForm {
    pub fn into_intent(self) -> TransactionIntent {
        match self {
            Self::SendMoney { amount, to } => TransactionIntent::SendMoney { amount, phone: to },
            Self::Pochi { amount, to } => TransactionIntent::Pochi { amount, phone: to },
            Self::Till { amount, till } => TransactionIntent::Till {
                amount,
                till_number: till,
            },
            Self::Paybill {
                amount,
                business,
                account,
            } => TransactionIntent::Paybill {
                amount,
                business_number: business,
                account_number: account,
            },
            Self::Withdraw {
                amount,
                agent,
                store,
            } => TransactionIntent::Withdraw {
                amount,
                agent_number: agent,
                store_number: store,
            },
        }
    }
}

pub fn execute_trigger_command(
    submitter: &dyn IntentSubmitter,
    contacts: &dyn ContactDirectory,
    form: TriggerForm,
) -> Result<String, String> {
    let resolved = resolve_intent(form.into_intent(), contacts).map_err(|e| e.to_string())?;
    submitter.submit(&resolved.intent).map_err(|e| match e {
        SubmitError::NotConfigured => {
            "push config is not set. run: ussd-relay config save".to_string()
        }
        SubmitError::Locked => "push config is locked. run: ussd-relay config unlock".to_string(),
        other => format!("trigger failed: {other}"),
    })?;
    Ok(format!("OK {}", describe_intent(&resolved)))
}

pub fn report_voice_outcome(outcome: &VoiceTurnOutcome) -> Result<String, String> {
    match outcome {
        VoiceTurnOutcome::Submitted(intent) => Ok(format!("submitted {}", intent.mode_name())),
        VoiceTurnOutcome::Cancelled | VoiceTurnOutcome::Superseded => {
            Ok("cancelled".to_string())
        }
        VoiceTurnOutcome::NothingPending => Ok("nothing to confirm".to_string()),
        VoiceTurnOutcome::Failed(_) => Err("voice command failed".to_string()),
    }
}
