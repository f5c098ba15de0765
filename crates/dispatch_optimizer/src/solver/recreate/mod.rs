pub mod best_insertion;
