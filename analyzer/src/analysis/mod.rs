pub mod correlation;
pub mod engagement;
pub mod followers;
pub mod frequency;
pub mod reach;
pub mod top_days;
