use app_model::{package_of, FieldDetail, PlannedApiClass};

/// Render the deterministic entity/DTO mapper for a DTO-based class. The
/// mapper is template output, not model output, so it never goes through
/// the generation loop.
pub fn render_dto_mapper(api: &PlannedApiClass, fields: &[FieldDetail]) -> String {
    let mapper_package = package_of(&api.mapper_name);
    let mapper_simple = api.mapper_simple_name();
    let entity = &api.simple_name;
    let dto = &api.dto_name;

    let mut to_dto = String::new();
    let mut from_dto = String::new();
    for field in fields {
        let accessor = accessor_suffix(&field.variable_name);
        to_dto.push_str(&format!(
            "        builder.set{accessor}(entity.get{accessor}());\n"
        ));
        from_dto.push_str(&format!(
            "        entity.set{accessor}(dto.get{accessor}());\n"
        ));
    }

    format!(
        "package {mapper_package};\n\
         \n\
         import {full_name};\n\
         import {proto_package}.{dto};\n\
         \n\
         /** Converts between {entity} entities and {dto} messages. */\n\
         public final class {mapper_simple} {{\n\
         \n\
         \x20   private {mapper_simple}() {{\n\
         \x20   }}\n\
         \n\
         \x20   public static {dto} toDto({entity} entity) {{\n\
         \x20       {dto}.Builder builder = {dto}.newBuilder();\n\
         {to_dto}\
         \x20       return builder.build();\n\
         \x20   }}\n\
         \n\
         \x20   public static {entity} fromDto({dto} dto) {{\n\
         \x20       {entity} entity = new {entity}();\n\
         {from_dto}\
         \x20       return entity;\n\
         \x20   }}\n\
         }}\n",
        full_name = api.full_name,
        proto_package = api.proto_package,
    )
}

/// `orderStatus` -> `OrderStatus`, matching JavaBeans accessor naming.
fn accessor_suffix(field_name: &str) -> String {
    let mut chars = field_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
