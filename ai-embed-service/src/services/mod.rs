pub mod ollama_service;
pub mod voyage_service;
