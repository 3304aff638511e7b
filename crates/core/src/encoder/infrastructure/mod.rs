pub mod subprocess_encoder;
