pub   fn   messy( a:i32,b :i32 )->i32{a*b}
fn other(){let  x=1;let _=x;}
