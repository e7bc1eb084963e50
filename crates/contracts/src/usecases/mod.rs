pub mod u101_csv_import;
