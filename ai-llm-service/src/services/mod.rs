//! Per-provider HTTP clients (Ollama, OpenAI, Gemini).

pub mod gemini_service;
pub mod ollama_service;
pub mod open_ai_service;
