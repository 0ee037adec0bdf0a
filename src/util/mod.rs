pub mod html;
pub mod lenient;
