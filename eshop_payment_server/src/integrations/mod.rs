pub mod ylt;
