pub mod prerequisite_dag;
