mod inventory_dumper_test;
