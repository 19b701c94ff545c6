// Job records: the applications an owner is tracking.
// Core fields are edited here; analysis fields only arrive via a job analysis merge.

pub mod handlers;
