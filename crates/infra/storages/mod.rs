pub mod local_images;
