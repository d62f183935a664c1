pub mod latlng;
