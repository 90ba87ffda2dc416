pub mod imglab_loader;
