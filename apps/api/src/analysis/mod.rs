// Résumé analysis pipeline.
// Validate → compose → provider (retry/timeout) → tolerant parse → normalize → persist.
// All provider calls go through the gateway; nothing here talks to the Anthropic API directly.

pub mod composer;
pub mod gateway;
pub mod handlers;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod single_flight;
pub mod validation;

#[cfg(test)]
pub mod testing;
