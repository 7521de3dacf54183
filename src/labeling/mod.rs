//! Training label derivation.
//!
//! Labels are recomputed from the full history snapshot on every training run;
//! nothing in this module persists them.

pub mod dev_doc;

pub use dev_doc::{
    HistoryOrder, InvalidBugPolicy, LABEL_DOMAIN, Label, LabelDeriver, LabelError, LabelOptions,
    LabelSet, derive_labels, label_for_bug,
};
