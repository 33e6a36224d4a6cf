mod changeset_tests;
mod checkpoint_tests;
mod helpers;
