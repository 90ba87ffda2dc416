pub mod vision_backend;
