//! Default answers to engine questions

use pkbridge_types::Role;

use crate::engine::{Answer, Question};

/// An answer plus optional text for the output buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub answer: Answer,
    pub output: Option<String>,
}

impl Resolution {
    fn silent(answer: Answer) -> Self {
        Self {
            answer,
            output: None,
        }
    }
}

/// Decide how a job running as `role` answers `question`
#[must_use]
pub fn resolve(role: Role, question: &Question) -> Resolution {
    match question {
        Question::InstallIgnorePkg { package } => match role {
            Role::InstallPackages => Resolution {
                answer: Answer::No,
                output: Some(format!("{}: was not ignored\n", package.name)),
            },
            _ => Resolution::silent(Answer::No),
        },

        Question::ReplacePkg { .. }
        | Question::ConflictPkg { .. }
        | Question::CorruptedPkg { .. }
        | Question::LocalNewer { .. } => {
            tracing::debug!(?question, "safe question");
            Resolution::silent(Answer::Yes)
        }

        Question::RemovePkgs { .. } | Question::ImportKey { .. } => {
            tracing::debug!(?question, "unsafe question");
            Resolution::silent(Answer::No)
        }

        Question::SelectProvider { providers, depend } => {
            let output = match providers.first() {
                Some(provider) => Some(format!(
                    "provider package was selected ({} provides {})\n",
                    provider.name, depend.name
                )),
                None => {
                    tracing::warn!(depend = %depend, "provider question without providers");
                    None
                }
            };
            Resolution {
                answer: Answer::Index(0),
                output,
            }
        }

        Question::Other { code } => {
            tracing::warn!(code, "unknown question");
            Resolution::silent(Answer::Unset)
        }
    }
}
