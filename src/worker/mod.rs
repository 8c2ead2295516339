pub mod index_worker;
