pub mod delivery_service;
