pub mod remapper;
