use crate::modules::image::handle::*;
use actix_web::web::{scope, PathConfig, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(health).service(
        scope("/images")
            .app_data(PathConfig::default().error_handler(path_error))
            .service(list_images)
            .service(upload_image)
            .service(migrate_images)
            .service(get_image)
            .service(delete_image),
    );
}
